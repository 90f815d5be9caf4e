//! This module contains the page compression kernels.
//!
//! Every page body (or, for v2 data pages, the value section) is compressed
//! independently with the column chunk's codec. Unlike a self-describing frame
//! format, the uncompressed size is carried by the page header, so the kernels
//! here write raw codec output with no length prefix and verify the size on the
//! way back.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};
use zstd::stream::{Decoder, Encoder};

use crate::error::ColumnarError;
use crate::types::CompressionCodec;

/// Default level used for ZSTD when none is configured.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;
/// Default level used for GZIP when none is configured.
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

//==================================================================================
// 1. Core Logic (The "Engine")
//==================================================================================

fn zstd_compress(input_bytes: &[u8], output_buf: &mut Vec<u8>, level: i32) -> Result<(), ColumnarError> {
    let mut encoder =
        Encoder::new(output_buf, level).map_err(|e| ColumnarError::Compression(format!("zstd: {}", e)))?;
    encoder
        .write_all(input_bytes)
        .map_err(|e| ColumnarError::Compression(format!("zstd: {}", e)))?;
    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| ColumnarError::Compression(format!("zstd: {}", e)))?;
    Ok(())
}

fn zstd_decompress(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), ColumnarError> {
    let mut decoder =
        Decoder::new(input_bytes).map_err(|e| ColumnarError::Compression(format!("zstd: {}", e)))?;
    std::io::copy(&mut decoder, output_buf).map_err(|e| ColumnarError::Compression(format!("zstd: {}", e)))?;
    Ok(())
}

fn gzip_compress(input_bytes: &[u8], output_buf: &mut Vec<u8>, level: u32) -> Result<(), ColumnarError> {
    let mut encoder = GzEncoder::new(output_buf, flate2::Compression::new(level.min(9)));
    encoder
        .write_all(input_bytes)
        .map_err(|e| ColumnarError::Compression(format!("gzip: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ColumnarError::Compression(format!("gzip: {}", e)))?;
    Ok(())
}

fn gzip_decompress(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), ColumnarError> {
    GzDecoder::new(input_bytes)
        .read_to_end(output_buf)
        .map_err(|e| ColumnarError::Compression(format!("gzip: {}", e)))?;
    Ok(())
}

fn snappy_compress(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), ColumnarError> {
    let compressed = snap::raw::Encoder::new()
        .compress_vec(input_bytes)
        .map_err(|e| ColumnarError::Compression(format!("snappy: {}", e)))?;
    output_buf.extend_from_slice(&compressed);
    Ok(())
}

fn snappy_decompress(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), ColumnarError> {
    let decompressed = snap::raw::Decoder::new()
        .decompress_vec(input_bytes)
        .map_err(|e| ColumnarError::Compression(format!("snappy: {}", e)))?;
    output_buf.extend_from_slice(&decompressed);
    Ok(())
}

//==================================================================================
// 2. Public API
//==================================================================================

/// True when this build can both write and read the codec.
pub fn is_supported(codec: CompressionCodec) -> bool {
    matches!(
        codec,
        CompressionCodec::Uncompressed
            | CompressionCodec::Snappy
            | CompressionCodec::Gzip
            | CompressionCodec::Zstd
    )
}

/// Appends the compressed form of `input_bytes` to `output_buf`.
pub fn compress(
    codec: CompressionCodec,
    level: Option<i32>,
    input_bytes: &[u8],
    output_buf: &mut Vec<u8>,
) -> Result<(), ColumnarError> {
    match codec {
        CompressionCodec::Uncompressed => {
            output_buf.extend_from_slice(input_bytes);
            Ok(())
        }
        CompressionCodec::Snappy => snappy_compress(input_bytes, output_buf),
        CompressionCodec::Gzip => gzip_compress(
            input_bytes,
            output_buf,
            level.map_or(DEFAULT_GZIP_LEVEL, |l| l.max(0) as u32),
        ),
        CompressionCodec::Zstd => zstd_compress(input_bytes, output_buf, level.unwrap_or(DEFAULT_ZSTD_LEVEL)),
        other => Err(ColumnarError::UnsupportedType(format!("compression codec {}", other))),
    }
}

/// Decompresses `input_bytes`, checking the result is exactly `uncompressed_size` bytes.
pub fn decompress(
    codec: CompressionCodec,
    input_bytes: &[u8],
    uncompressed_size: usize,
) -> Result<Vec<u8>, ColumnarError> {
    let mut output_buf = Vec::with_capacity(uncompressed_size);
    match codec {
        CompressionCodec::Uncompressed => output_buf.extend_from_slice(input_bytes),
        CompressionCodec::Snappy => snappy_decompress(input_bytes, &mut output_buf)?,
        CompressionCodec::Gzip => gzip_decompress(input_bytes, &mut output_buf)?,
        CompressionCodec::Zstd => zstd_decompress(input_bytes, &mut output_buf)?,
        other => return Err(ColumnarError::UnsupportedType(format!("compression codec {}", other))),
    }

    if output_buf.len() != uncompressed_size {
        return Err(ColumnarError::Compression(format!(
            "{} page decompressed to {} bytes, header declares {}",
            codec,
            output_buf.len(),
            uncompressed_size
        )));
    }
    Ok(output_buf)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORTED: [CompressionCodec; 4] = [
        CompressionCodec::Uncompressed,
        CompressionCodec::Snappy,
        CompressionCodec::Gzip,
        CompressionCodec::Zstd,
    ];

    #[test]
    fn test_roundtrip_every_supported_codec() {
        let original =
            b"hello world, this is a test of page compression. hello world, this is a test.".repeat(20);

        for codec in SUPPORTED {
            let mut compressed = Vec::new();
            compress(codec, None, &original, &mut compressed).unwrap();
            if codec != CompressionCodec::Uncompressed {
                assert!(compressed.len() < original.len(), "{} should shrink the input", codec);
            }
            let decompressed = decompress(codec, &compressed, original.len()).unwrap();
            assert_eq!(decompressed, original, "codec {}", codec);
        }
    }

    #[test]
    fn test_empty_input_roundtrips() {
        for codec in SUPPORTED {
            let mut compressed = Vec::new();
            compress(codec, Some(1), &[], &mut compressed).unwrap();
            assert!(decompress(codec, &compressed, 0).unwrap().is_empty());
        }
    }

    #[test]
    fn test_size_mismatch_is_reported() {
        let mut compressed = Vec::new();
        compress(CompressionCodec::Zstd, None, &[42u8; 1000], &mut compressed).unwrap();
        let result = decompress(CompressionCodec::Zstd, &compressed, 999);
        assert!(matches!(result, Err(ColumnarError::Compression(_))));
    }

    #[test]
    fn test_corrupt_input_errors() {
        let result = decompress(CompressionCodec::Snappy, &[0x0A], 10);
        assert!(matches!(result, Err(ColumnarError::Compression(_))));
    }

    #[test]
    fn test_unsupported_codec_is_rejected() {
        let mut out = Vec::new();
        let result = compress(CompressionCodec::Brotli, None, b"abc", &mut out);
        assert!(matches!(result, Err(ColumnarError::UnsupportedType(_))));
        assert!(!is_supported(CompressionCodec::Lz4));
    }
}
