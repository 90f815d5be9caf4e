//! This module contains the pure, stateless kernels for the PLAIN encoding.
//!
//! PLAIN is the baseline value layout every reader must understand:
//! - fixed-width numbers are stored little-endian, back to back;
//! - booleans are bit-packed LSB-first, one bit per value;
//! - variable-length byte arrays carry a 4-byte little-endian length prefix;
//! - fixed-length byte arrays are stored raw.
//!
//! Decoders return the decoded values together with the number of bytes they
//! consumed, so a caller can detect trailing garbage or a short page.

use bitvec::prelude::*;

use crate::error::ColumnarError;

//==================================================================================
// 1. Fixed-Width Little-Endian Values
//==================================================================================

/// A primitive with a fixed little-endian PLAIN representation.
pub trait LeBytes: bytemuck::Pod {
    const WIDTH: usize;
    fn write_le(self, out: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_le_bytes {
    ($($t:ty => $w:literal),+ $(,)?) => {
        $(
            impl LeBytes for $t {
                const WIDTH: usize = $w;

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; $w];
                    buf.copy_from_slice(&bytes[..$w]);
                    <$t>::from_le_bytes(buf)
                }
            }
        )+
    };
}

impl_le_bytes!(i32 => 4, i64 => 8, u32 => 4, u64 => 8, f32 => 4, f64 => 8);

/// Appends the PLAIN encoding of fixed-width values.
pub fn encode_fixed<T: LeBytes>(values: &[T], output_buf: &mut Vec<u8>) {
    if cfg!(target_endian = "little") {
        output_buf.extend_from_slice(bytemuck::cast_slice(values));
        return;
    }
    output_buf.reserve(values.len() * T::WIDTH);
    for &v in values {
        v.write_le(output_buf);
    }
}

/// Decodes `num_values` fixed-width values.
pub fn decode_fixed<T: LeBytes>(
    input_bytes: &[u8],
    num_values: usize,
) -> Result<(Vec<T>, usize), ColumnarError> {
    let needed = num_values.saturating_mul(T::WIDTH);
    if input_bytes.len() < needed {
        return Err(ColumnarError::PlainDecodeError(format!(
            "need {} bytes for {} values, found {}",
            needed,
            num_values,
            input_bytes.len()
        )));
    }
    let raw = &input_bytes[..needed];
    if cfg!(target_endian = "little") {
        // Page buffers are rarely aligned for `T`; fall through when the view fails.
        if let Ok(view) = bytemuck::try_cast_slice::<u8, T>(raw) {
            return Ok((view.to_vec(), needed));
        }
    }
    let values = raw.chunks_exact(T::WIDTH).map(T::read_le).collect();
    Ok((values, needed))
}

//==================================================================================
// 2. Booleans (bit-packed, LSB first)
//==================================================================================

pub fn encode_bools(values: &[bool], output_buf: &mut Vec<u8>) {
    let mut bits = BitVec::<u8, Lsb0>::with_capacity(values.len());
    bits.extend(values.iter().copied());
    output_buf.extend_from_slice(bits.as_raw_slice());
}

pub fn decode_bools(
    input_bytes: &[u8],
    num_values: usize,
) -> Result<(Vec<bool>, usize), ColumnarError> {
    let needed = num_values.div_ceil(8);
    if input_bytes.len() < needed {
        return Err(ColumnarError::PlainDecodeError(format!(
            "need {} bytes for {} booleans, found {}",
            needed,
            num_values,
            input_bytes.len()
        )));
    }
    let bits = BitSlice::<u8, Lsb0>::from_slice(&input_bytes[..needed]);
    Ok((bits.iter().by_vals().take(num_values).collect(), needed))
}

//==================================================================================
// 3. Byte Arrays
//==================================================================================

/// Appends length-prefixed byte arrays.
pub fn encode_byte_arrays<B: AsRef<[u8]>>(
    values: &[B],
    output_buf: &mut Vec<u8>,
) -> Result<(), ColumnarError> {
    for v in values {
        let bytes = v.as_ref();
        let len = u32::try_from(bytes.len()).map_err(|_| {
            ColumnarError::InvalidArgument(format!(
                "byte array of {} bytes exceeds the 4 GiB PLAIN limit",
                bytes.len()
            ))
        })?;
        output_buf.extend_from_slice(&len.to_le_bytes());
        output_buf.extend_from_slice(bytes);
    }
    Ok(())
}

pub fn decode_byte_arrays(
    input_bytes: &[u8],
    num_values: usize,
) -> Result<(Vec<Vec<u8>>, usize), ColumnarError> {
    // Every value carries a 4-byte length prefix.
    let mut values = Vec::with_capacity(num_values.min(input_bytes.len() / 4));
    let mut pos = 0usize;
    for i in 0..num_values {
        let len_bytes = input_bytes.get(pos..pos + 4).ok_or_else(|| {
            ColumnarError::PlainDecodeError(format!("length prefix of value {} is truncated", i))
        })?;
        let len = u32::read_le(len_bytes) as usize;
        pos += 4;
        let bytes = input_bytes.get(pos..pos + len).ok_or_else(|| {
            ColumnarError::PlainDecodeError(format!(
                "value {} declares {} bytes but only {} remain",
                i,
                len,
                input_bytes.len() - pos
            ))
        })?;
        values.push(bytes.to_vec());
        pos += len;
    }
    Ok((values, pos))
}

/// Appends fixed-length byte arrays, checking each has `type_length` bytes.
pub fn encode_fixed_len<B: AsRef<[u8]>>(
    values: &[B],
    type_length: usize,
    output_buf: &mut Vec<u8>,
) -> Result<(), ColumnarError> {
    for v in values {
        let bytes = v.as_ref();
        if bytes.len() != type_length {
            return Err(ColumnarError::BufferMismatch(type_length, bytes.len()));
        }
        output_buf.extend_from_slice(bytes);
    }
    Ok(())
}

pub fn decode_fixed_len(
    input_bytes: &[u8],
    num_values: usize,
    type_length: usize,
) -> Result<(Vec<Vec<u8>>, usize), ColumnarError> {
    let needed = num_values.saturating_mul(type_length);
    if input_bytes.len() < needed {
        return Err(ColumnarError::PlainDecodeError(format!(
            "need {} bytes for {} values of width {}, found {}",
            needed,
            num_values,
            type_length,
            input_bytes.len()
        )));
    }
    if type_length == 0 {
        return Ok((vec![Vec::new(); num_values], 0));
    }
    let values = input_bytes[..needed]
        .chunks_exact(type_length)
        .map(<[u8]>::to_vec)
        .collect();
    Ok((values, needed))
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
