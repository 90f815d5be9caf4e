//! This module contains the kernels for ULEB128 (unsigned little-endian base 128)
//! variable-length integers, plus the zigzag mapping used for signed values.
//!
//! Varints appear in two places in the file format: the run headers of the
//! RLE/bit-packing hybrid and every integer of the Thrift compact protocol.
//! All functions are panic-free on malformed input.

use num_traits::{PrimInt, Unsigned};
use std::io::Cursor;

use crate::error::ColumnarError;

//==================================================================================
// 1. Public API for Single-Value Operations
//==================================================================================

/// Encodes a single unsigned integer into a LEB128 byte sequence, writing to a buffer.
pub fn encode_one<T>(value: T, buffer: &mut Vec<u8>) -> Result<(), ColumnarError>
where
    T: PrimInt + Unsigned,
{
    let zero = T::zero();
    let seven_bit_mask = T::from(0x7F).ok_or_else(|| {
        ColumnarError::Leb128DecodeError("Failed to create 7-bit mask for type".to_string())
    })?;
    let continuation_bit_t = T::from(0x80).ok_or_else(|| {
        ColumnarError::Leb128DecodeError("Failed to create continuation bit for type".to_string())
    })?;

    let mut current_value = value;
    loop {
        let mut byte = current_value & seven_bit_mask;
        current_value = current_value >> 7;
        if current_value != zero {
            byte = byte | continuation_bit_t;
        }

        let byte_u8 = byte.to_u8().ok_or_else(|| {
            ColumnarError::Leb128DecodeError("Failed to convert generic integer to u8".to_string())
        })?;
        buffer.push(byte_u8);

        if current_value == zero {
            break;
        }
    }
    Ok(())
}

/// Decodes a single unsigned integer from a LEB128 byte stream cursor.
pub fn decode_one<T>(cursor: &mut Cursor<&[u8]>) -> Result<T, ColumnarError>
where
    T: PrimInt + Unsigned,
{
    let mut result = T::zero();
    let mut shift = 0;
    let total_bits = std::mem::size_of::<T>() * 8;

    loop {
        let pos = cursor.position() as usize;
        let byte = *cursor
            .get_ref()
            .get(pos)
            .ok_or_else(|| ColumnarError::Leb128DecodeError("Unexpected end of buffer".to_string()))?;
        cursor.set_position((pos + 1) as u64);

        let seven_bit_payload = T::from(byte & 0x7F).ok_or_else(|| {
            ColumnarError::Leb128DecodeError("Failed to create 7-bit payload from byte".to_string())
        })?;

        if shift >= total_bits {
            return Err(ColumnarError::Leb128DecodeError(
                "Integer overflow during decoding".to_string(),
            ));
        }

        result = result | (seven_bit_payload << shift);

        if byte & 0x80 == 0 {
            // The final group may not set bits above the type's width.
            if shift + 7 > total_bits && (byte >> (total_bits - shift)) > 0 {
                return Err(ColumnarError::Leb128DecodeError(
                    "Integer overflow during decoding".to_string(),
                ));
            }
            return Ok(result);
        }

        shift += 7;
    }
}

//==================================================================================
// 2. Zigzag Mapping
//==================================================================================

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
