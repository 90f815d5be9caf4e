//! Typed partition constants.
//!
//! A partition value is known from outside the file (typically a directory
//! name). It is never read from pages: the reader broadcasts it into every row
//! of the matching output column.

use std::sync::Arc;

use arrow::array::{
    new_null_array, ArrayRef, BooleanArray, Date32Array, Decimal128Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::compute::kernels::cast::{can_cast_types, cast};
use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use crate::error::ColumnarError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PartitionValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// Days since the Unix epoch.
    Date32(i32),
    Decimal128 { value: i128, precision: u8, scale: i8 },
}

impl PartitionValue {
    /// The Arrow type the constant naturally has.
    pub fn data_type(&self) -> DataType {
        match self {
            PartitionValue::Null => DataType::Null,
            PartitionValue::Boolean(_) => DataType::Boolean,
            PartitionValue::Int32(_) => DataType::Int32,
            PartitionValue::Int64(_) => DataType::Int64,
            PartitionValue::Float64(_) => DataType::Float64,
            PartitionValue::Utf8(_) => DataType::Utf8,
            PartitionValue::Date32(_) => DataType::Date32,
            PartitionValue::Decimal128 { precision, scale, .. } => DataType::Decimal128(*precision, *scale),
        }
    }

    /// True when the constant can be produced as `target`.
    pub fn can_produce(&self, target: &DataType) -> bool {
        matches!(self, PartitionValue::Null) || can_cast_types(&self.data_type(), target)
    }

    /// Broadcasts the constant into an array of `num_rows` rows of type `target`.
    pub fn to_array(&self, target: &DataType, num_rows: usize) -> Result<ArrayRef, ColumnarError> {
        let natural: ArrayRef = match self {
            PartitionValue::Null => return Ok(new_null_array(target, num_rows)),
            PartitionValue::Boolean(v) => Arc::new(BooleanArray::from(vec![*v; num_rows])),
            PartitionValue::Int32(v) => Arc::new(Int32Array::from(vec![*v; num_rows])),
            PartitionValue::Int64(v) => Arc::new(Int64Array::from(vec![*v; num_rows])),
            PartitionValue::Float64(v) => Arc::new(Float64Array::from(vec![*v; num_rows])),
            PartitionValue::Utf8(v) => Arc::new(StringArray::from(vec![v.as_str(); num_rows])),
            PartitionValue::Date32(v) => Arc::new(Date32Array::from(vec![*v; num_rows])),
            PartitionValue::Decimal128 { value, precision, scale } => Arc::new(
                Decimal128Array::from(vec![*value; num_rows]).with_precision_and_scale(*precision, *scale)?,
            ),
        };
        if natural.data_type() == target {
            return Ok(natural);
        }
        Ok(cast(&natural, target)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::Int16Type;

    #[test]
    fn test_broadcast_same_type() {
        let array = PartitionValue::Utf8("2024-01-01".into()).to_array(&DataType::Utf8, 3).unwrap();
        let strings = array.as_string::<i32>();
        assert_eq!(strings.len(), 3);
        assert!(strings.iter().all(|v| v == Some("2024-01-01")));
    }

    #[test]
    fn test_broadcast_casts_to_requested_type() {
        let array = PartitionValue::Int32(7).to_array(&DataType::Int16, 4).unwrap();
        assert_eq!(array.data_type(), &DataType::Int16);
        assert!(array.as_primitive::<Int16Type>().iter().all(|v| v == Some(7)));
    }

    #[test]
    fn test_null_partition_is_all_null() {
        let array = PartitionValue::Null.to_array(&DataType::Int64, 5).unwrap();
        assert_eq!(array.null_count(), 5);
        assert!(PartitionValue::Null.can_produce(&DataType::Date32));
    }

    #[test]
    fn test_decimal_partition() {
        let value = PartitionValue::Decimal128 { value: 1234, precision: 9, scale: 2 };
        let array = value.to_array(&DataType::Decimal128(9, 2), 2).unwrap();
        assert_eq!(array.data_type(), &DataType::Decimal128(9, 2));
        assert!(!PartitionValue::Boolean(true).can_produce(&DataType::Date32));
    }
}
