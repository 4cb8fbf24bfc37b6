//! Status word classification.
//!
//! Every exchange with the device ends with a two-byte status word. This
//! module maps it onto a closed set of outcomes so that the rest of the
//! bridge never compares raw codes.
//!
//! | Status   | Outcome                    |
//! |----------|----------------------------|
//! | `0x9000` | [`Outcome::Success`]       |
//! | `0x6985` | [`Outcome::UserCancelled`] |
//! | `0x6c66` | [`Outcome::PolicyDenied`]  |
//! | `0x6d00` | [`Outcome::Unsupported`]   |
//! | other    | [`Outcome::Unknown`]       |

use crate::apdu::ApduResponse;
use crate::error::{Error, Result};

/// Known status words.
#[derive(Debug)]
pub struct StatusWord;

impl StatusWord {
    /// Success.
    pub const OK: u16 = 0x9000;

    /// The user rejected the request on the device.
    pub const CANCELLED: u16 = 0x6985;

    /// The operation is disabled in the device application settings.
    pub const NOT_ALLOWED: u16 = 0x6c66;

    /// The instruction is not implemented by the device application.
    pub const UNSUPPORTED: u16 = 0x6d00;

    /// Wrong application open. Raised by the transport, not the application.
    pub const WRONG_APP: u16 = 0x6700;

    /// Device locked. Raised by the transport, not the application.
    pub const LOCKED: u16 = 0x6804;
}

/// The classified outcome of a device exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The device accepted the command.
    Success,

    /// The user rejected the request on the device.
    UserCancelled,

    /// The operation is disabled in the device settings.
    PolicyDenied,

    /// The device firmware or application does not implement the operation.
    Unsupported,

    /// Any other status word.
    Unknown(u16),
}

impl Outcome {
    /// Classifies a status word. Total over all 16-bit values.
    #[must_use]
    pub const fn classify(status: u16) -> Self {
        match status {
            StatusWord::OK => Self::Success,
            StatusWord::CANCELLED => Self::UserCancelled,
            StatusWord::NOT_ALLOWED => Self::PolicyDenied,
            StatusWord::UNSUPPORTED => Self::Unsupported,
            other => Self::Unknown(other),
        }
    }

    /// Converts a non-success outcome into the matching error.
    ///
    /// # Errors
    ///
    /// Returns the [`Error`] variant for every outcome except
    /// [`Outcome::Success`].
    pub const fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::UserCancelled => Err(Error::UserCancelled),
            Self::PolicyDenied => Err(Error::PolicyDenied),
            Self::Unsupported => Err(Error::Unsupported),
            Self::Unknown(code) => Err(Error::UnknownStatus(code)),
        }
    }
}

/// Classifies a response and returns its payload on success.
///
/// `marker` is the number of leading marker bytes to strip.
///
/// # Errors
///
/// Returns the device outcome as an error when the status is not success,
/// and [`Error::MalformedResponse`] when a successful response is too short.
pub fn interpret(response: &ApduResponse, marker: usize) -> Result<&[u8]> {
    Outcome::classify(response.status_word()).into_result()?;
    response.payload(marker)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(Outcome::classify(0x9000), Outcome::Success);
        assert_eq!(Outcome::classify(0x6985), Outcome::UserCancelled);
        assert_eq!(Outcome::classify(0x6c66), Outcome::PolicyDenied);
        assert_eq!(Outcome::classify(0x6d00), Outcome::Unsupported);
        assert_eq!(Outcome::classify(0x6a80), Outcome::Unknown(0x6a80));
    }

    #[test]
    fn transport_codes_are_unknown_to_the_application_layer() {
        assert_eq!(
            Outcome::classify(StatusWord::LOCKED),
            Outcome::Unknown(0x6804)
        );
        assert_eq!(
            Outcome::classify(StatusWord::WRONG_APP),
            Outcome::Unknown(0x6700)
        );
    }

    #[test]
    fn interpret_success_returns_payload() {
        let response = ApduResponse::from_bytes(vec![0x02, 0xDE, 0xAD, 0x90, 0x00]).unwrap();
        assert_eq!(interpret(&response, 1).unwrap(), &[0xDE, 0xAD]);
    }

    #[test]
    fn interpret_failure_ignores_payload() {
        let response = ApduResponse::from_status(0x6985);
        assert_eq!(interpret(&response, 1), Err(Error::UserCancelled));

        let response = ApduResponse::from_status(0x6c66);
        assert_eq!(interpret(&response, 1), Err(Error::PolicyDenied));
    }

    proptest! {
        #[test]
        fn classification_is_total(status in any::<u16>()) {
            let outcome = Outcome::classify(status);
            let known = [0x9000, 0x6985, 0x6c66, 0x6d00];
            if known.contains(&status) {
                prop_assert!(!matches!(outcome, Outcome::Unknown(_)));
            } else {
                prop_assert_eq!(outcome, Outcome::Unknown(status));
            }
            prop_assert_eq!(outcome.into_result().is_ok(), status == 0x9000);
        }
    }
}
