//! APDU (Application Protocol Data Unit) command and response types.
//!
//! # APDU Command Structure
//!
//! ```text
//! | CLA | INS | P1 | P2 | Lc | Data |
//! |-----|-----|----|----|----|------|
//! | 1B  | 1B  | 1B | 1B | 1B | Var  |
//! ```
//!
//! Only the short form is used: a single command never carries more than
//! [`Apdu::MAX_DATA`] bytes. Larger payloads are split into frames by
//! [`crate::chunk`].
//!
//! # APDU Response Structure
//!
//! ```text
//! | Marker | Data | SW1 | SW2 |
//! |--------|------|-----|-----|
//! | 0/1B   | Var  | 1B  | 1B  |
//! ```
//!
//! Key, address and signature responses start with a one-byte length marker
//! that is not part of the payload.
//!
//! # Example
//!
//! ```
//! use ledger_bridge_core::apdu::{Apdu, ApduResponse};
//!
//! let apdu = Apdu::new(0xE0, 0x01, 0x00, 0x00, vec![]);
//! assert_eq!(apdu.to_bytes(), vec![0xE0, 0x01, 0x00, 0x00]);
//!
//! let response = ApduResponse::from_bytes(vec![0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
//! assert!(response.is_success());
//! ```

use crate::codec;
use crate::error::Result;
use crate::status::StatusWord;

/// An APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    /// Class byte.
    cla: u8,

    /// Instruction byte.
    ins: u8,

    /// Parameter 1.
    p1: u8,

    /// Parameter 2.
    p2: u8,

    /// Command data.
    data: Vec<u8>,
}

impl Apdu {
    /// Maximum data length of a single command.
    pub const MAX_DATA: usize = 255;

    /// Creates a new APDU command.
    ///
    /// # Arguments
    ///
    /// * `cla` - Class byte
    /// * `ins` - Instruction byte
    /// * `p1` - Parameter 1
    /// * `p2` - Parameter 2
    /// * `data` - Command data, at most [`Apdu::MAX_DATA`] bytes
    #[must_use]
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data,
        }
    }

    /// Returns the class byte.
    #[must_use]
    pub const fn cla(&self) -> u8 {
        self.cla
    }

    /// Returns the instruction byte.
    #[must_use]
    pub const fn ins(&self) -> u8 {
        self.ins
    }

    /// Returns parameter 1.
    #[must_use]
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Returns parameter 2.
    #[must_use]
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Returns the command data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serializes the APDU to bytes.
    ///
    /// The `Lc` byte is omitted when the command carries no data.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        debug_assert!(self.data.len() <= Self::MAX_DATA);

        let mut bytes = Vec::with_capacity(5 + self.data.len());
        bytes.push(self.cla);
        bytes.push(self.ins);
        bytes.push(self.p1);
        bytes.push(self.p2);

        if !self.data.is_empty() {
            bytes.push(self.data.len() as u8);
            bytes.extend_from_slice(&self.data);
        }

        bytes
    }
}

/// An APDU response from the device.
///
/// Holds the raw bytes so that both the full response length (checked by
/// get-configuration) and the marker-stripped payload stay available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Raw response bytes, status word included.
    raw: Vec<u8>,

    /// Decoded trailing status word.
    status: u16,
}

impl ApduResponse {
    /// Creates a response from raw bytes (`data || SW1 || SW2`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`](crate::Error::MalformedResponse) if fewer than 2 bytes are given.
    pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
        let status = codec::decode_status(&raw)?;
        Ok(Self { raw, status })
    }

    /// Creates a response carrying only a status word.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self {
            raw: status.to_be_bytes().to_vec(),
            status,
        }
    }

    /// Returns the raw response bytes.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the total length of the raw response.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the response has no data before the status word.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.len() <= 2
    }

    /// Returns the response data (everything before the status word).
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.raw[..self.raw.len() - 2]
    }

    /// Returns the data after skipping `offset` leading marker bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`](crate::Error::MalformedResponse) if the response is too short.
    pub fn payload(&self, offset: usize) -> Result<&[u8]> {
        codec::extract_payload(&self.raw, offset)
    }

    /// Returns the full status word.
    #[must_use]
    pub const fn status_word(&self) -> u16 {
        self.status
    }

    /// Checks if the response indicates success (`SW = 0x9000`).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == StatusWord::OK
    }
}
