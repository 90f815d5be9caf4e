//! This module provides a set of shared, low-level utility functions used
//! throughout the crate.
//!
//! Its primary responsibilities include:
//! 1.  Sizing rules for decimals stored in fixed-length byte arrays.
//! 2.  Conversions between `i128` unscaled decimals and their big-endian
//!     two's-complement byte form.

use crate::error::ColumnarError;

//==================================================================================
// 1. Decimal Sizing
//==================================================================================

/// Largest decimal precision whose unscaled values fit in `num_bytes` bytes.
pub fn max_precision_for_length(num_bytes: usize) -> u8 {
    if num_bytes == 0 {
        return 0;
    }
    if num_bytes >= 16 {
        return 38;
    }
    // 10^p - 1 <= 2^(8n - 1) - 1
    let max_unscaled = (1i128 << (8 * num_bytes - 1)) - 1;
    let mut precision = 0u8;
    let mut bound = 1i128;
    while bound.saturating_mul(10) - 1 <= max_unscaled {
        bound *= 10;
        precision += 1;
    }
    precision
}

/// Smallest byte width able to hold every unscaled value of `precision`.
pub fn min_length_for_precision(precision: u8) -> usize {
    (1..=16)
        .find(|&n| max_precision_for_length(n) >= precision)
        .unwrap_or(16)
}

//==================================================================================
// 2. Big-Endian Two's Complement
//==================================================================================

/// Encodes `value` as `num_bytes` big-endian two's-complement bytes.
pub fn i128_to_be_bytes(value: i128, num_bytes: usize) -> Result<Vec<u8>, ColumnarError> {
    if num_bytes == 0 || num_bytes > 16 {
        return Err(ColumnarError::InvalidArgument(format!(
            "decimal byte width {} is outside 1..=16",
            num_bytes
        )));
    }
    let full = value.to_be_bytes();
    let (dropped, kept) = full.split_at(16 - num_bytes);
    // Truncation is lossless only if every dropped byte is pure sign extension.
    let sign_byte = if value < 0 { 0xFF } else { 0x00 };
    let sign_matches = kept.first().is_some_and(|b| (b & 0x80 != 0) == (value < 0));
    if dropped.iter().any(|&b| b != sign_byte) || !sign_matches {
        return Err(ColumnarError::InvalidArgument(format!(
            "decimal value {} does not fit in {} bytes",
            value, num_bytes
        )));
    }
    Ok(kept.to_vec())
}

/// Decodes big-endian two's-complement bytes (at most 16) into an `i128`.
pub fn be_bytes_to_i128(bytes: &[u8]) -> Result<i128, ColumnarError> {
    if bytes.len() > 16 {
        return Err(ColumnarError::InvalidData(format!(
            "decimal of {} bytes exceeds 128 bits",
            bytes.len()
        )));
    }
    if bytes.is_empty() {
        return Ok(0);
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buf))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_table_matches_format_limits() {
        assert_eq!(max_precision_for_length(1), 2);
        assert_eq!(max_precision_for_length(4), 9);
        assert_eq!(max_precision_for_length(5), 11);
        assert_eq!(max_precision_for_length(8), 18);
        assert_eq!(max_precision_for_length(16), 38);
        assert_eq!(min_length_for_precision(9), 4);
        assert_eq!(min_length_for_precision(19), 9);
        assert_eq!(min_length_for_precision(38), 16);
    }

    #[test]
    fn test_be_bytes_roundtrip() {
        for v in [0i128, 1, -1, 12345, -98765, i64::MAX as i128 * 4] {
            let bytes = i128_to_be_bytes(v, 9).unwrap();
            assert_eq!(bytes.len(), 9);
            assert_eq!(be_bytes_to_i128(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn test_negative_sign_extension() {
        assert_eq!(i128_to_be_bytes(-2, 2).unwrap(), vec![0xFF, 0xFE]);
        assert_eq!(be_bytes_to_i128(&[0xFF, 0xFE]).unwrap(), -2);
    }

    #[test]
    fn test_value_too_wide_is_rejected() {
        assert!(i128_to_be_bytes(128, 1).is_err());
        assert!(i128_to_be_bytes(-129, 1).is_err());
        assert!(i128_to_be_bytes(127, 1).is_ok());
    }
}
