//! Multi-frame transmission of oversized payloads.
//!
//! A payload longer than [`Apdu::MAX_DATA`] is split into consecutive frames.
//! Each frame reuses the command's `CLA`, `INS` and `P1`; `P2` carries the
//! frame's position so the device can accumulate the message:
//!
//! | Role           | P2     |
//! |----------------|--------|
//! | single         | `0x00` |
//! | first          | `0x02` |
//! | intermediate   | `0x03` |
//! | last           | `0x01` |
//!
//! The device keeps the partial message as linear state, so frames are sent
//! one at a time and the exchange stops at the first non-success status.

use tracing::{debug, warn};

use crate::apdu::{Apdu, ApduResponse};
use crate::error::Result;
use crate::status::StatusWord;
use crate::transport::Transport;

/// Position of a frame within a chunked payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRole {
    /// The whole payload fits in this frame.
    Single,

    /// First of several frames.
    First,

    /// Neither first nor last.
    Intermediate,

    /// Last of several frames.
    Last,
}

impl FrameRole {
    /// Returns the `P2` value announcing this role.
    #[must_use]
    pub const fn p2(self) -> u8 {
        match self {
            Self::Single => 0x00,
            Self::Last => 0x01,
            Self::First => 0x02,
            Self::Intermediate => 0x03,
        }
    }
}

/// One transmission unit of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Position of the frame.
    pub role: FrameRole,

    /// Bytes carried by the frame.
    pub data: &'a [u8],
}

/// The fixed part of a chunked command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    /// Class byte.
    pub cla: u8,

    /// Instruction byte.
    pub ins: u8,

    /// Parameter 1, identical on every frame.
    pub p1: u8,
}

impl CommandHeader {
    /// Builds the command for one frame.
    #[must_use]
    pub fn frame(self, frame: Frame<'_>) -> Apdu {
        Apdu::new(self.cla, self.ins, self.p1, frame.role.p2(), frame.data.to_vec())
    }
}

/// Splits a payload into frames of at most [`Apdu::MAX_DATA`] bytes.
///
/// An empty payload yields one empty [`FrameRole::Single`] frame.
#[must_use]
pub fn split_frames(payload: &[u8]) -> Vec<Frame<'_>> {
    if payload.len() <= Apdu::MAX_DATA {
        return vec![Frame {
            role: FrameRole::Single,
            data: payload,
        }];
    }

    let count = payload.len().div_ceil(Apdu::MAX_DATA);
    payload
        .chunks(Apdu::MAX_DATA)
        .enumerate()
        .map(|(index, data)| {
            let role = match index {
                0 => FrameRole::First,
                i if i + 1 == count => FrameRole::Last,
                _ => FrameRole::Intermediate,
            };
            Frame { role, data }
        })
        .collect()
}

/// Sends `payload` as one or more frames and returns the deciding response.
///
/// The deciding response is the first one whose status is not success, or
/// the last frame's response when every frame succeeded. Frames after a
/// failure are never sent.
///
/// # Errors
///
/// Returns an error if the transport fails; no further frames are sent.
pub async fn transmit<T: Transport>(
    transport: &mut T,
    header: CommandHeader,
    payload: &[u8],
) -> Result<ApduResponse> {
    let frames = split_frames(payload);
    let total = frames.len();
    let mut last = None;

    for (index, frame) in frames.into_iter().enumerate() {
        debug!(
            ins = header.ins,
            frame = index + 1,
            total,
            role = ?frame.role,
            len = frame.data.len(),
            "sending frame"
        );

        let response = transport.exchange(&header.frame(frame)).await?;
        if !response.is_success() {
            warn!(
                ins = header.ins,
                frame = index + 1,
                total,
                status = format_args!("{:#06x}", response.status_word()),
                "device rejected frame, stopping transmission"
            );
            return Ok(response);
        }
        last = Some(response);
    }

    // split_frames never returns an empty list
    Ok(last.unwrap_or_else(|| ApduResponse::from_status(StatusWord::OK)))
}
