//! Definition levels for flat optional columns.
//!
//! With a maximum definition level of 1 each level is a single bit, encoded with
//! the RLE/bit-packing hybrid at bit width 1. Data page v1 prefixes the stream
//! with its byte length (u32 LE); data page v2 records the length in the page
//! header instead and stores the stream bare.

use crate::error::ColumnarError;
use crate::kernels::rle;

const LEVEL_BIT_WIDTH: u8 = 1;

/// Appends the level stream for `validity`, with the v1 length prefix if asked.
pub fn encode(validity: &[bool], with_length_prefix: bool, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
    let levels: Vec<u32> = validity.iter().map(|&v| v as u32).collect();

    if !with_length_prefix {
        return rle::encode(&levels, LEVEL_BIT_WIDTH, out);
    }

    let prefix_at = out.len();
    out.extend_from_slice(&[0u8; 4]);
    rle::encode(&levels, LEVEL_BIT_WIDTH, out)?;
    let stream_len = u32::try_from(out.len() - prefix_at - 4).map_err(|_| {
        ColumnarError::InvalidArgument("definition level stream exceeds 4 GiB".to_string())
    })?;
    out[prefix_at..prefix_at + 4].copy_from_slice(&stream_len.to_le_bytes());
    Ok(())
}

/// Decodes a length-prefixed (v1) level stream, returning validity and bytes consumed.
pub fn decode_prefixed(bytes: &[u8], num_values: usize) -> Result<(Vec<bool>, usize), ColumnarError> {
    let prefix: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| ColumnarError::RleDecodeError("missing definition level length".to_string()))?;
    let stream_len = u32::from_le_bytes(prefix) as usize;
    let stream = bytes.get(4..4 + stream_len).ok_or_else(|| {
        ColumnarError::RleDecodeError(format!(
            "definition levels declare {} bytes, {} available",
            stream_len,
            bytes.len() - 4
        ))
    })?;
    Ok((decode(stream, num_values)?, 4 + stream_len))
}

/// Decodes a bare (v2) level stream.
pub fn decode(stream: &[u8], num_values: usize) -> Result<Vec<bool>, ColumnarError> {
    let (levels, _) = rle::decode(stream, LEVEL_BIT_WIDTH, num_values)?;
    Ok(levels.into_iter().map(|level| level == 1).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_levels_roundtrip() {
        let validity: Vec<bool> = (0..100).map(|i| i % 3 != 0).collect();
        let mut out = Vec::new();
        encode(&validity, true, &mut out).unwrap();

        let declared = u32::from_le_bytes([out[0], out[1], out[2], out[3]]) as usize;
        assert_eq!(declared + 4, out.len());

        let (decoded, consumed) = decode_prefixed(&out, validity.len()).unwrap();
        assert_eq!(decoded, validity);
        assert_eq!(consumed, out.len());
    }

    #[test]
    fn test_all_null_levels_are_one_run() {
        let mut out = Vec::new();
        encode(&[false; 1000], false, &mut out).unwrap();
        // RLE header (1000 << 1) as a varint followed by a single value byte.
        assert_eq!(out.len(), 3);
        assert_eq!(decode(&out, 1000).unwrap(), vec![false; 1000]);
    }

    #[test]
    fn test_truncated_prefix_is_an_error() {
        assert!(matches!(decode_prefixed(&[5, 0], 3), Err(ColumnarError::RleDecodeError(_))));
        assert!(matches!(decode_prefixed(&[5, 0, 0, 0, 1], 3), Err(ColumnarError::RleDecodeError(_))));
    }
}
