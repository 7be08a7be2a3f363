//! Variable-length integer encoding utilities.
//!
//! Uses 7 bits per byte with a continuation bit, the same layout as
//! protocol buffers. Length prefixes in model artifacts use this encoding.

use crate::error::{Result, VietcatError};

/// Maximum number of bytes an encoded u64 can occupy.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode a u64 value using variable-length encoding.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MAX_VARINT_LEN);
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // continuation bit
        }

        bytes.push(byte);

        if val == 0 {
            break;
        }
    }

    bytes
}

/// Decode a u64 value, returning the value and the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 || (shift == 63 && (byte & 0x7F) > 1) {
            return Err(VietcatError::model("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, i + 1));
        }

        shift += 7;
    }

    Err(VietcatError::model("Incomplete VarInt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_use_one_byte() {
        assert_eq!(encode_u64(0), vec![0]);
        assert_eq!(encode_u64(127), vec![127]);
        assert_eq!(encode_u64(128), vec![0x80, 0x01]);
    }

    #[test]
    fn test_decode_u64() {
        for value in [0u64, 1, 300, 16384, u32::MAX as u64, u64::MAX] {
            let encoded = encode_u64(value);
            assert!(encoded.len() <= MAX_VARINT_LEN);
            let (decoded, read) = decode_u64(&encoded).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(read, encoded.len());
        }
    }

    #[test]
    fn test_incomplete_varint() {
        assert!(decode_u64(&[0x80, 0x80]).is_err());
        assert!(decode_u64(&[]).is_err());
    }

    #[test]
    fn test_overflow() {
        let bytes = [0xFF; 11];
        assert!(decode_u64(&bytes).is_err());
    }
}
