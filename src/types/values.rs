// In: src/types/values.rs

//! Owned, physically-typed value buffers that move between the Arrow bridge and
//! the column chunk pipeline.
//!
//! Buffers hold only the non-null values of a column; nullability travels
//! separately as a validity vector (one `bool` per row).

use std::fmt;

use crate::types::PhysicalType;

/// A variable-length binary value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ByteArray(pub Vec<u8>);

/// A binary value whose width is fixed by the column's `type_length`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FixedLenByteArray(pub Vec<u8>);

impl AsRef<[u8]> for ByteArray {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for FixedLenByteArray {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ByteArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "ByteArray({:?})", s),
            Err(_) => write!(f, "ByteArray({:?})", self.0),
        }
    }
}

impl fmt::Debug for FixedLenByteArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedLenByteArray({:?})", self.0)
    }
}

impl From<&str> for ByteArray {
    fn from(s: &str) -> Self {
        ByteArray(s.as_bytes().to_vec())
    }
}

/// Dense (non-null) values of one column, tagged by physical type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    ByteArray(Vec<ByteArray>),
    FixedLenByteArray(Vec<FixedLenByteArray>),
}

impl ColumnValues {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            ColumnValues::Boolean(_) => PhysicalType::Boolean,
            ColumnValues::Int32(_) => PhysicalType::Int32,
            ColumnValues::Int64(_) => PhysicalType::Int64,
            ColumnValues::Float(_) => PhysicalType::Float,
            ColumnValues::Double(_) => PhysicalType::Double,
            ColumnValues::ByteArray(_) => PhysicalType::ByteArray,
            ColumnValues::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Double(v) => v.len(),
            ColumnValues::ByteArray(v) => v.len(),
            ColumnValues::FixedLenByteArray(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
