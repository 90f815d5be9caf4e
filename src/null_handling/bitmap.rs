// --- IN: src/null_handling/bitmap.rs ---

//! Pure, stateless kernels for handling nullability on the Arrow side.
//!
//! Writing strips an array down to its valid values plus a per-row validity
//! vector. Reading does the reverse: dense decoded values are spread back over
//! the rows whose definition level is 1.

use arrow::array::{Array, BooleanArray, BooleanBuilder, PrimitiveArray, PrimitiveBuilder};
use arrow::datatypes::ArrowPrimitiveType;

use crate::error::ColumnarError;

//==================================================================================
// 1. Stripping (Arrow -> dense values + validity)
//==================================================================================

/// Per-row validity of `array`, or `None` when the array has no nulls.
pub fn validity_of(array: &dyn Array) -> Option<Vec<bool>> {
    if array.null_count() == 0 {
        return None;
    }
    Some((0..array.len()).map(|i| array.is_valid(i)).collect())
}

/// Extracts the valid values of a `PrimitiveArray` into a dense `Vec`.
pub fn strip_valid_values<T: ArrowPrimitiveType>(array: &PrimitiveArray<T>) -> Vec<T::Native> {
    array.iter().flatten().collect()
}

/// `strip_valid_values` for `BooleanArray`, which is not a `PrimitiveArray`.
pub fn strip_valid_bools(array: &BooleanArray) -> Vec<bool> {
    array.iter().flatten().collect()
}

//==================================================================================
// 2. Re-applying (dense values + validity -> Arrow)
//==================================================================================

/// Spreads dense values over `num_rows` rows, yielding `None` where the row is null.
pub fn expand_to_rows<T>(
    dense: Vec<T>,
    validity: Option<&[bool]>,
    num_rows: usize,
) -> Result<Vec<Option<T>>, ColumnarError> {
    let Some(validity) = validity else {
        if dense.len() != num_rows {
            return Err(ColumnarError::InternalError(format!(
                "Data vector length ({}) does not match total rows ({}) when no validity is present",
                dense.len(),
                num_rows
            )));
        }
        return Ok(dense.into_iter().map(Some).collect());
    };

    if validity.len() != num_rows {
        return Err(ColumnarError::InternalError(format!(
            "Validity length ({}) does not match total rows ({})",
            validity.len(),
            num_rows
        )));
    }
    let mut data_iter = dense.into_iter();
    let mut rows = Vec::with_capacity(num_rows);
    for &is_valid in validity {
        if is_valid {
            let value = data_iter.next().ok_or_else(|| {
                ColumnarError::InternalError(
                    "Validity indicates more valid values than data provided".to_string(),
                )
            })?;
            rows.push(Some(value));
        } else {
            rows.push(None);
        }
    }
    if data_iter.next().is_some() {
        return Err(ColumnarError::InternalError(
            "Data provided more values than the validity marks as present".to_string(),
        ));
    }
    Ok(rows)
}

/// Re-applies validity to dense values, reconstructing a `PrimitiveArray`.
pub fn reapply_validity<T: ArrowPrimitiveType>(
    dense: Vec<T::Native>,
    validity: Option<&[bool]>,
    num_rows: usize,
) -> Result<PrimitiveArray<T>, ColumnarError> {
    let mut builder = PrimitiveBuilder::<T>::with_capacity(num_rows);
    for value in expand_to_rows(dense, validity, num_rows)? {
        builder.append_option(value);
    }
    Ok(builder.finish())
}

/// `reapply_validity` for booleans.
pub fn reapply_validity_bools(
    dense: Vec<bool>,
    validity: Option<&[bool]>,
    num_rows: usize,
) -> Result<BooleanArray, ColumnarError> {
    let mut builder = BooleanBuilder::with_capacity(num_rows);
    for value in expand_to_rows(dense, validity, num_rows)? {
        builder.append_option(value);
    }
    Ok(builder.finish())
}
