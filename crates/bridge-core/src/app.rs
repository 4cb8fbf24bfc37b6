//! Device application commands.
//!
//! [`LedgerApp`] binds a [`Transport`] to the wallet application running on
//! the device and exposes its five commands. Each call builds the command
//! bytes, sends them (chunked when needed), and classifies the final status
//! word. Nothing is retried: a rejected or failed signing request is reported
//! as is.
//!
//! # Example
//!
//! ```ignore
//! use ledger_bridge_core::app::LedgerApp;
//!
//! let mut app = LedgerApp::new(transport);
//! let config = app.get_configuration().await?;
//! let public_key = app.get_public_key(0, false).await?;
//! ```

use core::fmt;

use tracing::debug;

use crate::apdu::Apdu;
use crate::chunk::{self, CommandHeader};
use crate::codec::{MARKER_LEN, encode_account_index};
use crate::error::{Error, Result};
use crate::fields::{DeviceVersion, EncodingStrategy, SigningContext, encode_sign_transaction};
use crate::status::{Outcome, interpret};
use crate::transport::Transport;

/// Class byte of the wallet application.
pub const CLA: u8 = 0xE0;

/// Instruction codes.
pub mod ins {
    /// `GET_CONFIGURATION` instruction.
    pub const GET_CONFIGURATION: u8 = 0x01;

    /// `GET_PUBLIC_KEY` instruction.
    pub const GET_PUBLIC_KEY: u8 = 0x02;

    /// `SIGN_MESSAGE` instruction.
    pub const SIGN_MESSAGE: u8 = 0x03;

    /// `GET_ADDRESS` instruction.
    pub const GET_ADDRESS: u8 = 0x04;

    /// `SIGN_TRANSACTION` instruction.
    pub const SIGN_TRANSACTION: u8 = 0x05;
}

/// `P1` values.
mod p1 {
    /// Return the value without user interaction.
    pub(super) const NON_CONFIRM: u8 = 0x00;

    /// Display the value and wait for confirmation.
    pub(super) const CONFIRM: u8 = 0x01;
}

/// Raw length of a configuration response: 3 version bytes and the status.
const CONFIGURATION_LEN: usize = 5;

/// Length of public keys and addresses.
pub const KEY_LEN: usize = 32;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Application version.
    pub version: DeviceVersion,

    /// Raw response bytes, status word included.
    pub raw: Vec<u8>,
}

/// A device-application handle over a transport.
pub struct LedgerApp<T> {
    /// The underlying transport.
    transport: T,
}

impl<T> fmt::Debug for LedgerApp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerApp").finish_non_exhaustive()
    }
}

impl<T: Transport> LedgerApp<T> {
    /// Binds the application to an open transport.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the handle and returns the transport.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Reads the application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if a successful response is not
    /// exactly 5 bytes long, or the device outcome for any other status.
    pub async fn get_configuration(&mut self) -> Result<Configuration> {
        let apdu = Apdu::new(CLA, ins::GET_CONFIGURATION, 0x00, 0x00, Vec::new());
        let response = self.transport.exchange(&apdu).await?;
        Outcome::classify(response.status_word()).into_result()?;

        if response.len() != CONFIGURATION_LEN {
            return Err(Error::MalformedResponse(format!(
                "configuration response is {} bytes, expected {CONFIGURATION_LEN}",
                response.len()
            )));
        }

        let version = DeviceVersion::from_bytes(response.data())?;
        debug!(%version, "read device configuration");

        Ok(Configuration {
            version,
            raw: response.raw().to_vec(),
        })
    }

    /// Reads the encoding strategy matching the device firmware.
    ///
    /// # Errors
    ///
    /// See [`get_configuration`](Self::get_configuration).
    pub async fn encoding_strategy(&mut self) -> Result<EncodingStrategy> {
        let config = self.get_configuration().await?;
        Ok(EncodingStrategy::for_version(config.version))
    }

    /// Reads the public key of an account.
    ///
    /// # Arguments
    ///
    /// * `account` - Account index
    /// * `confirm` - Whether to display the key on the device first
    ///
    /// # Errors
    ///
    /// Returns the device outcome when the status is not success, and
    /// [`Error::MalformedResponse`] when fewer than 32 key bytes follow the
    /// marker.
    pub async fn get_public_key(&mut self, account: u32, confirm: bool) -> Result<[u8; KEY_LEN]> {
        let apdu = Apdu::new(
            CLA,
            ins::GET_PUBLIC_KEY,
            confirm_flag(confirm),
            0x00,
            encode_account_index(account).to_vec(),
        );
        let response = self.transport.exchange(&apdu).await?;
        take_key(interpret(&response, MARKER_LEN)?)
    }

    /// Reads the address of an account for a wallet contract type.
    ///
    /// # Errors
    ///
    /// Same as [`get_public_key`](Self::get_public_key).
    pub async fn get_address(
        &mut self,
        account: u32,
        wallet_type: u8,
        confirm: bool,
    ) -> Result<[u8; KEY_LEN]> {
        let mut data = encode_account_index(account).to_vec();
        data.push(wallet_type);

        let apdu = Apdu::new(CLA, ins::GET_ADDRESS, confirm_flag(confirm), 0x00, data);
        let response = self.transport.exchange(&apdu).await?;
        take_key(interpret(&response, MARKER_LEN)?)
    }

    /// Signs an arbitrary message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserCancelled`], [`Error::PolicyDenied`],
    /// [`Error::Unsupported`] or [`Error::UnknownStatus`] as reported by the
    /// device.
    pub async fn sign_message(&mut self, account: u32, message: &[u8]) -> Result<Vec<u8>> {
        let mut data = encode_account_index(account).to_vec();
        data.extend_from_slice(message);

        self.sign(ins::SIGN_MESSAGE, &data).await
    }

    /// Signs a serialized transaction.
    ///
    /// `strategy` must come from the device version of the current session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddressFormat`] for a bad destination address,
    /// otherwise the same errors as [`sign_message`](Self::sign_message).
    pub async fn sign_transaction(
        &mut self,
        account: u32,
        ctx: &SigningContext,
        message: &[u8],
        strategy: EncodingStrategy,
    ) -> Result<Vec<u8>> {
        let data = encode_sign_transaction(account, ctx, message, strategy)?;
        debug!(?strategy, len = data.len(), "encoded transaction payload");

        self.sign(ins::SIGN_TRANSACTION, &data).await
    }

    async fn sign(&mut self, ins: u8, data: &[u8]) -> Result<Vec<u8>> {
        let header = CommandHeader {
            cla: CLA,
            ins,
            p1: p1::CONFIRM,
        };
        let response = chunk::transmit(&mut self.transport, header, data).await?;
        Ok(interpret(&response, MARKER_LEN)?.to_vec())
    }
}

const fn confirm_flag(confirm: bool) -> u8 {
    if confirm { p1::CONFIRM } else { p1::NON_CONFIRM }
}

fn take_key(payload: &[u8]) -> Result<[u8; KEY_LEN]> {
    payload
        .get(..KEY_LEN)
        .and_then(|key| key.try_into().ok())
        .ok_or_else(|| {
            Error::MalformedResponse(format!(
                "expected {KEY_LEN} key bytes, got {}",
                payload.len()
            ))
        })
}
