//! Encoding of the integer records kept in the secret store
//!
//! The attempt counter and the suspension marker are stored as ASCII
//! decimal so platform tooling can inspect them.

use crate::error::{AuthError, Result};

/// Longest accepted record ("-9223372036854775808")
const MAX_RECORD_LEN: usize = 20;

/// Encode an attempt counter
pub fn encode_count(count: u32) -> Vec<u8> {
    count.to_string().into_bytes()
}

/// Decode an attempt counter
pub fn decode_count(bytes: &[u8]) -> Result<u32> {
    parse_ascii(bytes)?
        .parse::<u32>()
        .map_err(|e| AuthError::InvalidInput(format!("Corrupted attempt counter: {}", e)))
}

/// Encode a Unix timestamp (seconds)
pub fn encode_timestamp(timestamp: i64) -> Vec<u8> {
    timestamp.to_string().into_bytes()
}

/// Decode a Unix timestamp (seconds)
pub fn decode_timestamp(bytes: &[u8]) -> Result<i64> {
    parse_ascii(bytes)?
        .parse::<i64>()
        .map_err(|e| AuthError::InvalidInput(format!("Corrupted suspension marker: {}", e)))
}

fn parse_ascii(bytes: &[u8]) -> Result<&str> {
    if bytes.is_empty() || bytes.len() > MAX_RECORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Record length {} out of range",
            bytes.len()
        )));
    }
    std::str::from_utf8(bytes)
        .map_err(|_| AuthError::InvalidInput("Record is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_encoding_is_decimal() {
        assert_eq!(encode_count(4), b"4".to_vec());
        assert_eq!(decode_count(b"4").unwrap(), 4);
    }

    #[test]
    fn test_timestamp_encoding_is_decimal() {
        assert_eq!(encode_timestamp(1_731_000_000), b"1731000000".to_vec());
        assert_eq!(decode_timestamp(b"-5").unwrap(), -5);
    }

    #[test]
    fn test_corrupted_records_are_invalid_input() {
        assert!(matches!(decode_count(b""), Err(AuthError::InvalidInput(_))));
        assert!(matches!(decode_count(b"-1"), Err(AuthError::InvalidInput(_))));
        assert!(matches!(decode_count(&[0xff, 0xfe]), Err(AuthError::InvalidInput(_))));
        assert!(matches!(
            decode_timestamp(b"123456789012345678901234"),
            Err(AuthError::InvalidInput(_))
        ));
    }
}
