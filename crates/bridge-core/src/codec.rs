//! Pure byte transforms shared by command builders and response parsers.

use crate::error::{Error, Result};

/// Length of the trailing status word.
pub const STATUS_LEN: usize = 2;

/// Length of the leading marker on key, address and signature responses.
pub const MARKER_LEN: usize = 1;

/// Encodes an account index as 4 big-endian bytes.
///
/// # Example
///
/// ```
/// use ledger_bridge_core::codec::encode_account_index;
///
/// assert_eq!(encode_account_index(0x0102_0304), [0x01, 0x02, 0x03, 0x04]);
/// ```
#[must_use]
pub const fn encode_account_index(account: u32) -> [u8; 4] {
    account.to_be_bytes()
}

/// Reads the trailing status word of a raw response as big endian.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] if the response is shorter than 2 bytes.
pub fn decode_status(response: &[u8]) -> Result<u16> {
    match response {
        [.., sw1, sw2] => Ok(u16::from_be_bytes([*sw1, *sw2])),
        _ => Err(Error::MalformedResponse(format!(
            "response of {} bytes has no status word",
            response.len()
        ))),
    }
}

/// Returns the bytes between `offset` leading marker bytes and the status word.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] if the response cannot hold the
/// marker and the status word.
pub fn extract_payload(response: &[u8], offset: usize) -> Result<&[u8]> {
    if response.len() < offset + STATUS_LEN {
        return Err(Error::MalformedResponse(format!(
            "response of {} bytes is shorter than marker ({offset}) and status",
            response.len()
        )));
    }

    Ok(&response[offset..response.len() - STATUS_LEN])
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn decode_status_reads_last_two_bytes() {
        assert_eq!(decode_status(&[0x01, 0x69, 0x85]).unwrap(), 0x6985);
        assert_eq!(decode_status(&[0x90, 0x00]).unwrap(), 0x9000);
    }

    #[test]
    fn decode_status_rejects_short_input() {
        assert!(matches!(
            decode_status(&[]),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_status(&[0x90]),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn extract_payload_strips_marker_and_status() {
        let raw = [0x03, 0x0A, 0x0B, 0x0C, 0x90, 0x00];
        assert_eq!(extract_payload(&raw, MARKER_LEN).unwrap(), &[0x0A, 0x0B, 0x0C]);
        assert_eq!(extract_payload(&raw, 0).unwrap(), &[0x03, 0x0A, 0x0B, 0x0C]);
    }

    #[test]
    fn extract_payload_marker_only() {
        assert!(extract_payload(&[0x00, 0x90, 0x00], MARKER_LEN)
            .unwrap()
            .is_empty());
        assert!(extract_payload(&[0x90, 0x00], MARKER_LEN).is_err());
    }

    proptest! {
        #[test]
        fn account_index_round_trips(account in any::<u32>()) {
            let bytes = encode_account_index(account);
            prop_assert_eq!(u32::from_be_bytes(bytes), account);
        }
    }
}
