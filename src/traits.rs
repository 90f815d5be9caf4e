//! This module defines shared traits used across different kernels and the
//! column chunk pipeline.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use crate::error::ColumnarError;
use crate::kernels::plain;
use crate::types::{ByteArray, ColumnValues, FixedLenByteArray, PhysicalType, SortOrder};

/// A trait that maps a signed integer type to its unsigned counterpart.
pub trait HasUnsigned {
    type Unsigned;
}

// Implement the trait for the integer widths the physical types use.
macro_rules! impl_signed_unsigned_pair {
    ($S:ty, $U:ty) => {
        impl HasUnsigned for $S {
            type Unsigned = $U;
        }
    };
}

impl_signed_unsigned_pair!(i32, u32);
impl_signed_unsigned_pair!(i64, u64);

//==================================================================================
// ParquetNative: one Rust type per physical type
//==================================================================================

/// The Rust representation of a physical column type.
///
/// The column writer and reader are generic over this trait; everything that
/// differs between physical types (PLAIN layout, dictionary hashing, statistics
/// ordering) lives behind it.
pub trait ParquetNative: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const PHYSICAL: PhysicalType;

    /// Hashable identity used by the dictionary. Floats hash by bit pattern.
    type DictKey: Eq + Hash + Clone + Send + Sync + fmt::Debug;

    fn dict_key(&self) -> Self::DictKey;

    /// Bytes this value occupies in a PLAIN page.
    fn plain_size(&self) -> usize;

    fn plain_encode(values: &[Self], type_length: usize, out: &mut Vec<u8>) -> Result<(), ColumnarError>;

    /// Decodes `num_values` values, returning them with the bytes consumed.
    fn plain_decode(
        bytes: &[u8],
        num_values: usize,
        type_length: usize,
    ) -> Result<(Vec<Self>, usize), ColumnarError>;

    fn compare(&self, other: &Self, order: SortOrder) -> Ordering;

    /// NaN never participates in min/max statistics.
    fn is_nan(&self) -> bool {
        false
    }

    /// The statistics encoding of one value (PLAIN without a length prefix).
    fn stat_bytes(&self) -> Vec<u8>;

    fn into_column_values(values: Vec<Self>) -> ColumnValues;

    fn from_column_values(values: ColumnValues) -> Result<Vec<Self>, ColumnarError>;
}

fn physical_mismatch(expected: PhysicalType, found: &ColumnValues) -> ColumnarError {
    ColumnarError::InternalError(format!(
        "column expects {} values, received {}",
        expected,
        found.physical_type()
    ))
}

macro_rules! impl_integer_native {
    ($t:ty, $physical:ident) => {
        impl ParquetNative for $t {
            const PHYSICAL: PhysicalType = PhysicalType::$physical;
            type DictKey = $t;

            fn dict_key(&self) -> $t {
                *self
            }

            fn plain_size(&self) -> usize {
                std::mem::size_of::<$t>()
            }

            fn plain_encode(values: &[Self], _type_length: usize, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
                plain::encode_fixed(values, out);
                Ok(())
            }

            fn plain_decode(
                bytes: &[u8],
                num_values: usize,
                _type_length: usize,
            ) -> Result<(Vec<Self>, usize), ColumnarError> {
                plain::decode_fixed(bytes, num_values)
            }

            fn compare(&self, other: &Self, order: SortOrder) -> Ordering {
                match order {
                    SortOrder::Signed => self.cmp(other),
                    SortOrder::Unsigned => (*self as <$t as HasUnsigned>::Unsigned)
                        .cmp(&(*other as <$t as HasUnsigned>::Unsigned)),
                }
            }

            fn stat_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn into_column_values(values: Vec<Self>) -> ColumnValues {
                ColumnValues::$physical(values)
            }

            fn from_column_values(values: ColumnValues) -> Result<Vec<Self>, ColumnarError> {
                match values {
                    ColumnValues::$physical(v) => Ok(v),
                    other => Err(physical_mismatch(PhysicalType::$physical, &other)),
                }
            }
        }
    };
}

macro_rules! impl_float_native {
    ($t:ty, $bits:ty, $physical:ident) => {
        impl ParquetNative for $t {
            const PHYSICAL: PhysicalType = PhysicalType::$physical;
            type DictKey = $bits;

            fn dict_key(&self) -> $bits {
                self.to_bits()
            }

            fn plain_size(&self) -> usize {
                std::mem::size_of::<$t>()
            }

            fn plain_encode(values: &[Self], _type_length: usize, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
                plain::encode_fixed(values, out);
                Ok(())
            }

            fn plain_decode(
                bytes: &[u8],
                num_values: usize,
                _type_length: usize,
            ) -> Result<(Vec<Self>, usize), ColumnarError> {
                plain::decode_fixed(bytes, num_values)
            }

            fn compare(&self, other: &Self, _order: SortOrder) -> Ordering {
                self.total_cmp(other)
            }

            fn is_nan(&self) -> bool {
                <$t>::is_nan(*self)
            }

            fn stat_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn into_column_values(values: Vec<Self>) -> ColumnValues {
                ColumnValues::$physical(values)
            }

            fn from_column_values(values: ColumnValues) -> Result<Vec<Self>, ColumnarError> {
                match values {
                    ColumnValues::$physical(v) => Ok(v),
                    other => Err(physical_mismatch(PhysicalType::$physical, &other)),
                }
            }
        }
    };
}

impl_integer_native!(i32, Int32);
impl_integer_native!(i64, Int64);
impl_float_native!(f32, u32, Float);
impl_float_native!(f64, u64, Double);

impl ParquetNative for bool {
    const PHYSICAL: PhysicalType = PhysicalType::Boolean;
    type DictKey = bool;

    fn dict_key(&self) -> bool {
        *self
    }

    fn plain_size(&self) -> usize {
        1
    }

    fn plain_encode(values: &[Self], _type_length: usize, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
        plain::encode_bools(values, out);
        Ok(())
    }

    fn plain_decode(bytes: &[u8], num_values: usize, _type_length: usize) -> Result<(Vec<Self>, usize), ColumnarError> {
        plain::decode_bools(bytes, num_values)
    }

    fn compare(&self, other: &Self, _order: SortOrder) -> Ordering {
        self.cmp(other)
    }

    fn stat_bytes(&self) -> Vec<u8> {
        vec![*self as u8]
    }

    fn into_column_values(values: Vec<Self>) -> ColumnValues {
        ColumnValues::Boolean(values)
    }

    fn from_column_values(values: ColumnValues) -> Result<Vec<Self>, ColumnarError> {
        match values {
            ColumnValues::Boolean(v) => Ok(v),
            other => Err(physical_mismatch(PhysicalType::Boolean, &other)),
        }
    }
}

impl ParquetNative for ByteArray {
    const PHYSICAL: PhysicalType = PhysicalType::ByteArray;
    type DictKey = ByteArray;

    fn dict_key(&self) -> ByteArray {
        self.clone()
    }

    fn plain_size(&self) -> usize {
        4 + self.0.len()
    }

    fn plain_encode(values: &[Self], _type_length: usize, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
        plain::encode_byte_arrays(values, out)
    }

    fn plain_decode(bytes: &[u8], num_values: usize, _type_length: usize) -> Result<(Vec<Self>, usize), ColumnarError> {
        let (values, consumed) = plain::decode_byte_arrays(bytes, num_values)?;
        Ok((values.into_iter().map(ByteArray).collect(), consumed))
    }

    // Binary values always compare as unsigned bytes.
    fn compare(&self, other: &Self, _order: SortOrder) -> Ordering {
        self.0.cmp(&other.0)
    }

    fn stat_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    fn into_column_values(values: Vec<Self>) -> ColumnValues {
        ColumnValues::ByteArray(values)
    }

    fn from_column_values(values: ColumnValues) -> Result<Vec<Self>, ColumnarError> {
        match values {
            ColumnValues::ByteArray(v) => Ok(v),
            other => Err(physical_mismatch(PhysicalType::ByteArray, &other)),
        }
    }
}

impl ParquetNative for FixedLenByteArray {
    const PHYSICAL: PhysicalType = PhysicalType::FixedLenByteArray;
    type DictKey = FixedLenByteArray;

    fn dict_key(&self) -> FixedLenByteArray {
        self.clone()
    }

    fn plain_size(&self) -> usize {
        self.0.len()
    }

    fn plain_encode(values: &[Self], type_length: usize, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
        plain::encode_fixed_len(values, type_length, out)
    }

    fn plain_decode(bytes: &[u8], num_values: usize, type_length: usize) -> Result<(Vec<Self>, usize), ColumnarError> {
        let (values, consumed) = plain::decode_fixed_len(bytes, num_values, type_length)?;
        Ok((values.into_iter().map(FixedLenByteArray).collect(), consumed))
    }

    fn compare(&self, other: &Self, order: SortOrder) -> Ordering {
        match order {
            // Signed order applies to two's-complement decimals stored big-endian.
            SortOrder::Signed => compare_be_signed(&self.0, &other.0),
            SortOrder::Unsigned => self.0.cmp(&other.0),
        }
    }

    fn stat_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    fn into_column_values(values: Vec<Self>) -> ColumnValues {
        ColumnValues::FixedLenByteArray(values)
    }

    fn from_column_values(values: ColumnValues) -> Result<Vec<Self>, ColumnarError> {
        match values {
            ColumnValues::FixedLenByteArray(v) => Ok(v),
            other => Err(physical_mismatch(PhysicalType::FixedLenByteArray, &other)),
        }
    }
}

/// Compares equal-width big-endian two's-complement integers.
fn compare_be_signed(a: &[u8], b: &[u8]) -> Ordering {
    let neg_a = a.first().is_some_and(|x| x & 0x80 != 0);
    let neg_b = b.first().is_some_and(|x| x & 0x80 != 0);
    match (neg_a, neg_b) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.cmp(b),
    }
}
