// In: src/bridge/arrow_impl.rs

//! DATA MARSHALLING between Arrow arrays and physically-typed column values.
//!
//! On write, an array is split into its dense valid values (converted to the
//! column's physical type) and a per-row validity vector. On read, decoded
//! values are widened or reinterpreted into the requested Arrow type and the
//! validity is re-applied. Both directions assume the pair has already passed
//! the schema checks; a pair outside them is reported as `SchemaIncompatible`.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryBuilder, FixedSizeBinaryBuilder, StringBuilder,
};
use arrow::datatypes::*;

use crate::chunk_pipeline::ColumnData;
use crate::error::ColumnarError;
use crate::null_handling::bitmap;
use crate::schema::ColumnDescriptor;
use crate::types::{ByteArray, ColumnAnnotation, ColumnValues, FixedLenByteArray, PhysicalType};
use crate::utils;

fn incompatible(desc: &ColumnDescriptor, data_type: &DataType) -> ColumnarError {
    ColumnarError::SchemaIncompatible {
        column: desc.name.clone(),
        physical: desc.physical_description(),
        requested: data_type.to_string(),
    }
}

//==================================================================================
// 1. Arrow -> Column Values
//==================================================================================

/// Splits `array` into dense values of `desc`'s physical type and per-row validity.
///
/// Validity is `None` when the array has no nulls.
pub fn array_to_column(
    array: &dyn Array,
    desc: &ColumnDescriptor,
) -> Result<(ColumnValues, Option<Vec<bool>>), ColumnarError> {
    let validity = bitmap::validity_of(array);

    macro_rules! dense_as {
        ($T:ty, $variant:ident, $native:ty) => {
            ColumnValues::$variant(
                bitmap::strip_valid_values(array.as_primitive::<$T>())
                    .into_iter()
                    .map(|v| v as $native)
                    .collect(),
            )
        };
    }

    let values = match array.data_type() {
        DataType::Boolean => ColumnValues::Boolean(bitmap::strip_valid_bools(array.as_boolean())),
        DataType::Int8 => dense_as!(Int8Type, Int32, i32),
        DataType::Int16 => dense_as!(Int16Type, Int32, i32),
        DataType::Int32 => dense_as!(Int32Type, Int32, i32),
        DataType::UInt8 => dense_as!(UInt8Type, Int32, i32),
        DataType::UInt16 => dense_as!(UInt16Type, Int32, i32),
        // Unsigned 32/64-bit values keep their bit pattern in the signed storage type.
        DataType::UInt32 => dense_as!(UInt32Type, Int32, i32),
        DataType::Int64 => dense_as!(Int64Type, Int64, i64),
        DataType::UInt64 => dense_as!(UInt64Type, Int64, i64),
        DataType::Float32 => dense_as!(Float32Type, Float, f32),
        DataType::Float64 => dense_as!(Float64Type, Double, f64),
        DataType::Date32 => dense_as!(Date32Type, Int32, i32),
        DataType::Timestamp(TimeUnit::Millisecond, _) => dense_as!(TimestampMillisecondType, Int64, i64),
        DataType::Timestamp(TimeUnit::Microsecond, _) => dense_as!(TimestampMicrosecondType, Int64, i64),
        DataType::Decimal128(_, _) => {
            let unscaled = bitmap::strip_valid_values(array.as_primitive::<Decimal128Type>());
            decimal_to_storage(unscaled, desc)?
        }
        DataType::Utf8 => byte_arrays(array.as_string::<i32>().iter().flatten().map(str::as_bytes)),
        DataType::LargeUtf8 => byte_arrays(array.as_string::<i64>().iter().flatten().map(str::as_bytes)),
        DataType::Binary => byte_arrays(array.as_binary::<i32>().iter().flatten()),
        DataType::LargeBinary => byte_arrays(array.as_binary::<i64>().iter().flatten()),
        DataType::FixedSizeBinary(_) => ColumnValues::FixedLenByteArray(
            array
                .as_fixed_size_binary()
                .iter()
                .flatten()
                .map(|v| FixedLenByteArray(v.to_vec()))
                .collect(),
        ),
        other => {
            return Err(ColumnarError::UnsupportedType(format!(
                "cannot write column '{}' of type {}",
                desc.name, other
            )))
        }
    };

    if values.physical_type() != desc.physical_type {
        return Err(ColumnarError::InternalError(format!(
            "column '{}' produced {} values for {} storage",
            desc.name,
            values.physical_type(),
            desc.physical_type
        )));
    }
    Ok((values, validity))
}

fn byte_arrays<'a>(values: impl Iterator<Item = &'a [u8]>) -> ColumnValues {
    ColumnValues::ByteArray(values.map(|v| ByteArray(v.to_vec())).collect())
}

/// Narrows unscaled decimals into the column's storage, failing on values that do not fit.
fn decimal_to_storage(unscaled: Vec<i128>, desc: &ColumnDescriptor) -> Result<ColumnValues, ColumnarError> {
    let overflow = |v: i128| {
        ColumnarError::InvalidArgument(format!(
            "decimal {} does not fit the {} storage of column '{}'",
            v,
            desc.physical_description(),
            desc.name
        ))
    };
    Ok(match desc.physical_type {
        PhysicalType::Int32 => ColumnValues::Int32(
            unscaled
                .into_iter()
                .map(|v| i32::try_from(v).map_err(|_| overflow(v)))
                .collect::<Result<_, _>>()?,
        ),
        PhysicalType::Int64 => ColumnValues::Int64(
            unscaled
                .into_iter()
                .map(|v| i64::try_from(v).map_err(|_| overflow(v)))
                .collect::<Result<_, _>>()?,
        ),
        PhysicalType::FixedLenByteArray => ColumnValues::FixedLenByteArray(
            unscaled
                .into_iter()
                .map(|v| utils::i128_to_be_bytes(v, desc.type_length()).map(FixedLenByteArray))
                .collect::<Result<_, _>>()?,
        ),
        other => {
            return Err(ColumnarError::InternalError(format!(
                "decimal column '{}' has {} storage",
                desc.name, other
            )))
        }
    })
}

//==================================================================================
// 2. Column Values -> Arrow
//==================================================================================

/// Builds an array of type `target` from decoded column data.
pub fn column_to_array(
    data: ColumnData,
    desc: &ColumnDescriptor,
    target: &DataType,
) -> Result<ArrayRef, ColumnarError> {
    let validity = data.validity.as_deref();
    let num_rows = data.num_rows;
    let unsigned = matches!(desc.annotation(), ColumnAnnotation::Int { signed: false, .. });

    macro_rules! build {
        ($T:ty, $dense:expr) => {
            Arc::new(bitmap::reapply_validity::<$T>($dense, validity, num_rows)?) as ArrayRef
        };
    }
    macro_rules! decimal {
        ($dense:expr, $p:expr, $s:expr) => {
            Arc::new(
                bitmap::reapply_validity::<Decimal128Type>($dense, validity, num_rows)?
                    .with_precision_and_scale(*$p, *$s)?,
            ) as ArrayRef
        };
    }

    let array: ArrayRef = match (data.values, target) {
        (ColumnValues::Boolean(v), DataType::Boolean) => {
            Arc::new(bitmap::reapply_validity_bools(v, validity, num_rows)?) as ArrayRef
        }

        (ColumnValues::Int32(v), DataType::Int8) => build!(Int8Type, v.into_iter().map(|x| x as i8).collect()),
        (ColumnValues::Int32(v), DataType::Int16) => build!(Int16Type, v.into_iter().map(|x| x as i16).collect()),
        (ColumnValues::Int32(v), DataType::Int32) => build!(Int32Type, v),
        (ColumnValues::Int32(v), DataType::Int64) if unsigned => {
            build!(Int64Type, v.into_iter().map(|x| x as u32 as i64).collect())
        }
        (ColumnValues::Int32(v), DataType::Int64) => build!(Int64Type, v.into_iter().map(i64::from).collect()),
        (ColumnValues::Int32(v), DataType::Float64) => build!(Float64Type, v.into_iter().map(f64::from).collect()),
        (ColumnValues::Int32(v), DataType::Date32) => build!(Date32Type, v),
        (ColumnValues::Int32(v), DataType::Decimal128(p, s)) => {
            decimal!(v.into_iter().map(i128::from).collect(), p, s)
        }

        (ColumnValues::Int64(v), DataType::Int64) => build!(Int64Type, v),
        (ColumnValues::Int64(v), DataType::Decimal128(p, s)) if unsigned => {
            decimal!(v.into_iter().map(|x| x as u64 as i128).collect(), p, s)
        }
        (ColumnValues::Int64(v), DataType::Decimal128(p, s)) => {
            decimal!(v.into_iter().map(i128::from).collect(), p, s)
        }
        (ColumnValues::Int64(v), DataType::Timestamp(TimeUnit::Millisecond, tz)) => Arc::new(
            bitmap::reapply_validity::<TimestampMillisecondType>(v, validity, num_rows)?.with_timezone_opt(tz.clone()),
        ),
        (ColumnValues::Int64(v), DataType::Timestamp(TimeUnit::Microsecond, tz)) => {
            let micros = if desc.annotation() == ColumnAnnotation::TimestampMillis {
                v.into_iter()
                    .map(|ms| {
                        ms.checked_mul(1000).ok_or_else(|| {
                            ColumnarError::InvalidData(format!(
                                "timestamp {} ms in column '{}' overflows microseconds",
                                ms, desc.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                v
            };
            Arc::new(
                bitmap::reapply_validity::<TimestampMicrosecondType>(micros, validity, num_rows)?
                    .with_timezone_opt(tz.clone()),
            )
        }

        (ColumnValues::Float(v), DataType::Float32) => build!(Float32Type, v),
        (ColumnValues::Float(v), DataType::Float64) => build!(Float64Type, v.into_iter().map(f64::from).collect()),
        (ColumnValues::Double(v), DataType::Float64) => build!(Float64Type, v),

        (ColumnValues::ByteArray(v), DataType::Utf8) => string_array(v, desc, validity, num_rows)?,
        (ColumnValues::ByteArray(v), DataType::Binary) => {
            binary_array(v.into_iter().map(|b| b.0).collect(), validity, num_rows)?
        }
        (ColumnValues::ByteArray(v), DataType::Decimal128(p, s)) => {
            decimal!(v.iter().map(|b| utils::be_bytes_to_i128(&b.0)).collect::<Result<_, _>>()?, p, s)
        }

        (ColumnValues::FixedLenByteArray(v), DataType::Binary) => {
            binary_array(v.into_iter().map(|b| b.0).collect(), validity, num_rows)?
        }
        (ColumnValues::FixedLenByteArray(v), DataType::FixedSizeBinary(width)) => {
            let mut builder = FixedSizeBinaryBuilder::with_capacity(num_rows, *width);
            for value in bitmap::expand_to_rows(v, validity, num_rows)? {
                match value {
                    Some(bytes) => builder.append_value(&bytes.0)?,
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        (ColumnValues::FixedLenByteArray(v), DataType::Decimal128(p, s)) => {
            decimal!(v.iter().map(|b| utils::be_bytes_to_i128(&b.0)).collect::<Result<_, _>>()?, p, s)
        }

        _ => return Err(incompatible(desc, target)),
    };
    Ok(array)
}

fn string_array(
    values: Vec<ByteArray>,
    desc: &ColumnDescriptor,
    validity: Option<&[bool]>,
    num_rows: usize,
) -> Result<ArrayRef, ColumnarError> {
    let data_len = values.iter().map(|v| v.0.len()).sum();
    let mut builder = StringBuilder::with_capacity(num_rows, data_len);
    for value in bitmap::expand_to_rows(values, validity, num_rows)? {
        match value {
            Some(bytes) => {
                let text = std::str::from_utf8(&bytes.0).map_err(|e| {
                    ColumnarError::InvalidData(format!("column '{}' holds invalid UTF-8: {}", desc.name, e))
                })?;
                builder.append_value(text);
            }
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn binary_array(values: Vec<Vec<u8>>, validity: Option<&[bool]>, num_rows: usize) -> Result<ArrayRef, ColumnarError> {
    let data_len = values.iter().map(Vec::len).sum();
    let mut builder = BinaryBuilder::with_capacity(num_rows, data_len);
    for value in bitmap::expand_to_rows(values, validity, num_rows)? {
        builder.append_option(value);
    }
    Ok(Arc::new(builder.finish()))
}
