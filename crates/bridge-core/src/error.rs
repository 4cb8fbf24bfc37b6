//! Error types for the Ledger bridge.
//!
//! This module provides the closed failure taxonomy [`enum@Error`] shared by
//! every layer of the bridge, from byte decoding up to the control surface.
//!
//! # Error Categories
//!
//! - **Structural errors**: malformed device responses, invalid request input
//! - **Transport errors**: discovery timeout, locked device, wrong application,
//!   the user dismissing or denying the device picker
//! - **Device outcomes**: status words reported by the device application
//!
//! Every variant maps to a stable reason string through [`Error::reason`],
//! which is what the host application receives alongside the diagnostic text.
//!
//! # Example
//!
//! ```
//! use ledger_bridge_core::Error;
//!
//! let err = Error::UserCancelled;
//! assert_eq!(err.reason(), "TRANSACTION_REJECTED");
//! ```

use core::result::Result as CoreResult;
use hex::FromHexError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::transport::TransportError;

/// The main error type for the Ledger bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Structural Errors
    // =========================================================================
    /// The response from the device could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A destination address did not decode to exactly 32 bytes.
    #[error("invalid address format: {0}")]
    InvalidAddressFormat(String),

    /// The inbound request could not be parsed or is missing fields.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The companion bridge never became reachable within the poll bound.
    #[error("transport discovery timed out after {attempts} attempts")]
    TransportDiscoveryTimeout {
        /// Number of probes performed before giving up.
        attempts: u32,
    },

    /// Another application is open on the device.
    #[error("wrong application is open on the device")]
    DeviceWrongApplication,

    /// The device is locked.
    #[error("device is locked")]
    DeviceLocked,

    /// The user dismissed the device selection dialog.
    #[error("device selection was cancelled")]
    UserCancelledSelection,

    /// The user or the browser denied access to the device.
    #[error("access to the device was denied")]
    UserDeniedPermission,

    /// The operation was abandoned by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    // =========================================================================
    // Device Outcomes
    // =========================================================================
    /// The user rejected the request on the device (`0x6985`).
    #[error("request was rejected on the device")]
    UserCancelled,

    /// The operation is disabled in the device application settings (`0x6c66`).
    #[error("operation not allowed, enable it in the device app settings")]
    PolicyDenied,

    /// The device application does not implement the operation (`0x6d00`).
    #[error("operation is not supported by the device application")]
    Unsupported,

    /// The device returned a status word with no documented meaning.
    #[error("unexpected status word: {0:#06x}")]
    UnknownStatus(u16),
}

impl Error {
    /// Returns the stable reason string reported to the host application.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Self::InvalidAddressFormat(_) => "INVALID_ADDRESS",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::TransportDiscoveryTimeout { .. } => "TRANSPORT_TIMEOUT",
            Self::DeviceWrongApplication => "LEDGER_WRONG_APP",
            Self::DeviceLocked => "LEDGER_LOCKED",
            Self::UserCancelledSelection => "USER_CANCELLED",
            Self::UserDeniedPermission => "USER_DENIED",
            Self::Cancelled => "CANCELLED",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::UserCancelled => "TRANSACTION_REJECTED",
            Self::PolicyDenied => "SIGN_NOT_ALLOWED",
            Self::Unsupported => "SIGN_NON_SUPPORTED",
            Self::UnknownStatus(_) => "UNKNOWN_STATUS",
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::WrongApplication => Self::DeviceWrongApplication,
            TransportError::Locked => Self::DeviceLocked,
            TransportError::UserCancelledSelection => Self::UserCancelledSelection,
            TransportError::PermissionDenied => Self::UserDeniedPermission,
            TransportError::Unreachable(msg) | TransportError::Io(msg) => Self::Transport(msg),
        }
    }
}

impl From<FromHexError> for Error {
    fn from(err: FromHexError) -> Self {
        Self::InvalidRequest(format!("hex decoding failed: {err}"))
    }
}

impl From<SerdeJsonError> for Error {
    fn from(err: SerdeJsonError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

/// A specialized [`Result`] type for bridge operations.
pub type Result<T> = CoreResult<T, Error>;

#[cfg(test)]
mod tests {
    use serde_json::{Value, from_str};

    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownStatus(0x6a80);
        assert_eq!(err.to_string(), "unexpected status word: 0x6a80");

        let err = Error::TransportDiscoveryTimeout { attempts: 120 };
        assert_eq!(
            err.to_string(),
            "transport discovery timed out after 120 attempts"
        );
    }

    #[test]
    fn reasons_match_host_contract() {
        assert_eq!(Error::DeviceWrongApplication.reason(), "LEDGER_WRONG_APP");
        assert_eq!(Error::DeviceLocked.reason(), "LEDGER_LOCKED");
        assert_eq!(Error::UserCancelled.reason(), "TRANSACTION_REJECTED");
        assert_eq!(Error::Unsupported.reason(), "SIGN_NON_SUPPORTED");
        assert_eq!(Error::UserDeniedPermission.reason(), "USER_DENIED");
        assert_eq!(Error::UserCancelledSelection.reason(), "USER_CANCELLED");
        assert_eq!(Error::PolicyDenied.reason(), "SIGN_NOT_ALLOWED");
    }

    #[test]
    fn transport_errors_map_into_taxonomy() {
        assert_eq!(
            Error::from(TransportError::Locked),
            Error::DeviceLocked
        );
        assert_eq!(
            Error::from(TransportError::WrongApplication),
            Error::DeviceWrongApplication
        );
        assert_eq!(
            Error::from(TransportError::Io("pipe closed".to_string())),
            Error::Transport("pipe closed".to_string())
        );
    }

    #[test]
    fn from_hex_error() {
        let hex_err = FromHexError::InvalidHexCharacter { c: 'g', index: 0 };
        let err: Error = hex_err.into();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn from_json_error() {
        let json_err = from_str::<Value>("not valid json{").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.reason(), "INVALID_REQUEST");
    }
}
