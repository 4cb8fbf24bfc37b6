//! Transport and host capability abstractions.
//!
//! The bridge does not own a transport medium. WebHID, a USB handle or the
//! companion WebSocket are provided by the host through two traits:
//!
//! - [`Transport`]: one open byte pipe to the device application
//! - [`Connector`]: the environment able to open transports, probe the
//!   companion endpoint, ask for the companion to be launched, and sleep
//!
//! Host failures are mapped into the closed [`TransportError`] set at the
//! boundary, so the core never inspects free-form error text.
//!
//! Futures returned by these traits are not required to be `Send`: the
//! browser host runs everything on a single thread.

use core::time::Duration;

use thiserror::Error;

use crate::apdu::{Apdu, ApduResponse};
use crate::status::StatusWord;

/// Transport failures, as classified by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Another application is open on the device.
    #[error("wrong application open")]
    WrongApplication,

    /// The device is locked.
    #[error("device locked")]
    Locked,

    /// The user dismissed the device picker.
    #[error("device selection cancelled")]
    UserCancelledSelection,

    /// Access to the device was denied.
    #[error("permission denied")]
    PermissionDenied,

    /// The endpoint or device could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Any other I/O failure.
    #[error("i/o failure: {0}")]
    Io(String),
}

impl TransportError {
    /// Maps the raw codes raised below the application layer.
    ///
    /// Returns `None` for status words that the device application itself
    /// reports; those are classified by [`crate::status::Outcome`].
    #[must_use]
    pub const fn from_status_word(status: u16) -> Option<Self> {
        match status {
            StatusWord::WRONG_APP => Some(Self::WrongApplication),
            StatusWord::LOCKED => Some(Self::Locked),
            _ => None,
        }
    }
}

/// An open byte pipe to the device application.
#[expect(async_fn_in_trait, reason = "single-threaded hosts, no Send bound wanted")]
pub trait Transport {
    /// Sends one command and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the exchange fails below the
    /// application layer.
    async fn exchange(&mut self, apdu: &Apdu) -> Result<ApduResponse, TransportError>;

    /// Closes the pipe. Closing twice must be harmless.
    async fn close(&mut self);
}

/// The host environment used by [`crate::session::SessionManager`].
#[expect(async_fn_in_trait, reason = "single-threaded hosts, no Send bound wanted")]
pub trait Connector {
    /// The transport produced by this connector.
    type Transport: Transport;

    /// Opens the first compatible locally attached device.
    ///
    /// # Errors
    ///
    /// Fails at once if no device is reachable or the user refuses access.
    async fn open_local(&self) -> Result<Self::Transport, TransportError>;

    /// Checks whether the companion endpoint accepts connections.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint is not reachable.
    async fn probe_bridge(&self, url: &str) -> Result<(), TransportError>;

    /// Opens a transport through the companion endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection cannot be established.
    async fn open_bridge(&self, url: &str) -> Result<Self::Transport, TransportError>;

    /// Asks the environment to start the companion process.
    fn launch_companion(&self, uri: &str);

    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}
