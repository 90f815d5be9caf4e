//! This module contains the pure, stateless kernels for fixed-width bit-packing
//! and unpacking.
//!
//! Values are packed LSB-first: the first value occupies the lowest bits of the
//! first byte. This is the layout used by the bit-packed runs of the
//! RLE/bit-packing hybrid and by PLAIN booleans. A bit width of zero is legal
//! and packs to no bytes at all; every value then decodes as zero.

use bitvec::prelude::*;
use num_traits::{PrimInt, ToPrimitive, Unsigned};
use std::convert::TryFrom;

use crate::error::ColumnarError;

//==================================================================================
// 1. Generic Core Logic (The "Engine")
//==================================================================================

/// Encodes a slice of unsigned integers into a compact bit vector.
fn encode_slice<T>(data: &[T], bit_width: u8) -> Result<BitVec<u8, Lsb0>, ColumnarError>
where
    T: PrimInt + Unsigned + ToPrimitive,
{
    if bit_width > 64 {
        return Err(ColumnarError::BitpackEncodeError(0, bit_width));
    }

    let max_val = if bit_width >= 64 { u64::MAX } else { (1u64 << bit_width) - 1 };
    let mut bit_vec = BitVec::<u8, Lsb0>::with_capacity(data.len() * bit_width as usize);

    for &val in data {
        let val_u64 = val.to_u64().ok_or_else(|| {
            ColumnarError::UnsupportedType("Failed to convert value to u64 for bitpacking".to_string())
        })?;
        if val_u64 > max_val {
            return Err(ColumnarError::BitpackEncodeError(val_u64, bit_width));
        }
        bit_vec.extend_from_bitslice(&val_u64.view_bits::<Lsb0>()[..bit_width as usize]);
    }

    Ok(bit_vec)
}

/// Decodes a bit slice back into unsigned integers.
fn decode_slice<T>(
    bits: &BitSlice<u8, Lsb0>,
    bit_width: u8,
    num_values: usize,
) -> Result<Vec<T>, ColumnarError>
where
    T: PrimInt + Unsigned + TryFrom<u64>,
{
    if bit_width == 0 {
        return Ok(vec![T::zero(); num_values]);
    }
    if bit_width > 64 || bits.len() < num_values.saturating_mul(bit_width as usize) {
        return Err(ColumnarError::BitpackDecodeError);
    }

    let mut decoded = Vec::with_capacity(num_values);
    for chunk in bits.chunks(bit_width as usize).take(num_values) {
        let mut container = 0u64;
        for (i, bit) in chunk.iter().by_vals().enumerate() {
            if bit {
                container |= 1 << i;
            }
        }

        match T::try_from(container) {
            Ok(val) => decoded.push(val),
            Err(_) => return Err(ColumnarError::BitpackDecodeError),
        }
    }

    Ok(decoded)
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Number of bytes needed to hold `num_values` packed values.
pub fn packed_len(num_values: usize, bit_width: u8) -> usize {
    num_values.saturating_mul(bit_width as usize).div_ceil(8)
}

/// Appends the packed form of `input_slice` to `output_buf`.
pub fn encode<T>(input_slice: &[T], output_buf: &mut Vec<u8>, bit_width: u8) -> Result<(), ColumnarError>
where
    T: PrimInt + Unsigned + ToPrimitive,
{
    let bit_vec = encode_slice(input_slice, bit_width)?;
    output_buf.extend_from_slice(bit_vec.as_raw_slice());
    Ok(())
}

/// Unpacks `num_values` values from the front of `input_bytes`.
pub fn decode<T>(input_bytes: &[u8], bit_width: u8, num_values: usize) -> Result<Vec<T>, ColumnarError>
where
    T: PrimInt + Unsigned + TryFrom<u64>,
{
    let bits = BitSlice::<u8, Lsb0>::from_slice(input_bytes);
    decode_slice(bits, bit_width, num_values)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
