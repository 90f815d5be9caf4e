//! This module contains the kernels for the RLE/bit-packing hybrid encoding used
//! by definition levels and dictionary indices.
//!
//! The stream is a sequence of runs, each introduced by a ULEB128 header:
//! - `header & 1 == 0`: an RLE run of `header >> 1` copies of one value, stored
//!   in `ceil(bit_width / 8)` little-endian bytes;
//! - `header & 1 == 1`: `header >> 1` groups of 8 values, bit-packed LSB-first.
//!
//! A bit-packed run always holds a multiple of 8 values, so only the final run
//! of a stream may carry padding. Decoders stop after `num_values`.

use std::io::Cursor;

use crate::error::ColumnarError;
use crate::kernels::{bitpack, leb128};

/// Runs shorter than this are cheaper as part of a bit-packed group.
const MIN_RLE_RUN: usize = 8;

//==================================================================================
// 1. Core Logic (The "Engine")
//==================================================================================

fn value_byte_width(bit_width: u8) -> usize {
    (bit_width as usize).div_ceil(8)
}

fn write_rle_run(
    value: u32,
    run_len: usize,
    bit_width: u8,
    output_buf: &mut Vec<u8>,
) -> Result<(), ColumnarError> {
    leb128::encode_one((run_len as u64) << 1, output_buf)?;
    let bytes = value.to_le_bytes();
    output_buf.extend_from_slice(&bytes[..value_byte_width(bit_width)]);
    Ok(())
}

/// Writes buffered literals as one bit-packed run, zero-padding the last group.
fn flush_literals(
    literals: &mut Vec<u32>,
    bit_width: u8,
    output_buf: &mut Vec<u8>,
) -> Result<(), ColumnarError> {
    if literals.is_empty() {
        return Ok(());
    }
    let groups = literals.len().div_ceil(8);
    literals.resize(groups * 8, 0);
    leb128::encode_one(((groups as u64) << 1) | 1, output_buf)?;
    bitpack::encode(literals.as_slice(), output_buf, bit_width)?;
    literals.clear();
    Ok(())
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Smallest bit width able to represent `max_value`.
pub fn bit_width_for(max_value: u64) -> u8 {
    (64 - max_value.leading_zeros()) as u8
}

/// Appends the hybrid encoding of `values` to `output_buf`.
pub fn encode(values: &[u32], bit_width: u8, output_buf: &mut Vec<u8>) -> Result<(), ColumnarError> {
    if bit_width > 32 {
        return Err(ColumnarError::BitpackEncodeError(0, bit_width));
    }

    let mut literals: Vec<u32> = Vec::new();
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        let mut run = 1;
        while i + run < values.len() && values[i + run] == value {
            run += 1;
        }

        if run >= MIN_RLE_RUN {
            // Literals must close on a group boundary before an RLE run can start,
            // so borrow the head of the run to fill the open group.
            let fill = (8 - literals.len() % 8) % 8;
            if run - fill >= MIN_RLE_RUN {
                literals.extend(std::iter::repeat(value).take(fill));
                flush_literals(&mut literals, bit_width, output_buf)?;
                write_rle_run(value, run - fill, bit_width, output_buf)?;
                i += run;
                continue;
            }
        }

        literals.extend_from_slice(&values[i..i + run]);
        i += run;
    }
    flush_literals(&mut literals, bit_width, output_buf)
}

/// Decodes `num_values` values from the front of `input_bytes`, returning the
/// values and the number of bytes consumed.
pub fn decode(
    input_bytes: &[u8],
    bit_width: u8,
    num_values: usize,
) -> Result<(Vec<u32>, usize), ColumnarError> {
    if bit_width > 32 {
        return Err(ColumnarError::RleDecodeError(format!("invalid bit width {}", bit_width)));
    }

    // The declared count comes from a page header; reserve no more than the stream could pack.
    let mut values = Vec::with_capacity(num_values.min(input_bytes.len().saturating_mul(8)));
    let mut cursor = Cursor::new(input_bytes);

    while values.len() < num_values {
        let header: u64 = leb128::decode_one(&mut cursor).map_err(|_| {
            ColumnarError::RleDecodeError(format!(
                "stream ended after {} of {} values",
                values.len(),
                num_values
            ))
        })?;
        let pos = cursor.position() as usize;
        let remaining = num_values - values.len();

        if header & 1 == 1 {
            let count = usize::try_from(header >> 1)
                .ok()
                .and_then(|groups| groups.checked_mul(8))
                .ok_or_else(|| {
                    ColumnarError::RleDecodeError(format!("bit-packed run header {} is out of range", header))
                })?;
            let byte_len = bitpack::packed_len(count, bit_width);
            // Trailing groups past `num_values` may be cut short by some writers.
            let take = count.min(remaining);
            let avail = input_bytes.len() - pos;
            if avail < bitpack::packed_len(take, bit_width) {
                return Err(ColumnarError::RleDecodeError(format!(
                    "bit-packed run needs {} bytes, {} remain",
                    bitpack::packed_len(take, bit_width),
                    avail
                )));
            }
            let unpacked: Vec<u32> = bitpack::decode(&input_bytes[pos..], bit_width, take)?;
            values.extend_from_slice(&unpacked);
            cursor.set_position((pos + byte_len.min(avail)) as u64);
        } else {
            let run = (header >> 1) as usize;
            if run == 0 {
                return Err(ColumnarError::RleDecodeError("zero-length RLE run".to_string()));
            }
            let width = value_byte_width(bit_width);
            let raw = input_bytes.get(pos..pos + width).ok_or_else(|| {
                ColumnarError::RleDecodeError("RLE run value is truncated".to_string())
            })?;
            let mut buf = [0u8; 4];
            buf[..width].copy_from_slice(raw);
            let value = u32::from_le_bytes(buf);
            values.extend(std::iter::repeat(value).take(run.min(remaining)));
            cursor.set_position((pos + width) as u64);
        }
    }

    Ok((values, cursor.position() as usize))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
