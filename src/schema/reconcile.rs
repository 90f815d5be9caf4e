//! Reconciling a requested logical schema with a file's physical schema.
//!
//! Every requested field resolves to one of three sources:
//! 1.  a partition constant with the same name (never read from pages);
//! 2.  the same-named physical column, if its storage can produce the requested type;
//! 3.  nothing, in which case the column is null-filled and forced nullable.
//!
//! Names match exactly. A pair outside the compatibility table fails the whole
//! read with `SchemaIncompatible`, naming the column and both types.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef, TimeUnit as ArrowTimeUnit};

use crate::config::ReaderConfig;
use crate::error::ColumnarError;
use crate::schema::{ColumnDescriptor, ParquetSchema, PartitionValue};
use crate::types::{ColumnAnnotation, PhysicalType};

//==================================================================================
// 1. Resolved Schema
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    /// Leaf column index in the file schema.
    File(usize),
    Partition(PartitionValue),
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub field: FieldRef,
    pub source: ColumnSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub fields: Vec<ResolvedField>,
}

impl ResolvedSchema {
    pub fn output_schema(&self) -> SchemaRef {
        Arc::new(Schema::new(
            self.fields.iter().map(|f| f.field.clone()).collect::<Vec<_>>(),
        ))
    }

    /// File columns that must be decoded, in output order.
    pub fn file_columns(&self) -> Vec<usize> {
        self.fields
            .iter()
            .filter_map(|f| match f.source {
                ColumnSource::File(index) => Some(index),
                _ => None,
            })
            .collect()
    }
}

//==================================================================================
// 2. Default Derivation
//==================================================================================

fn unsupported_annotation(desc: &ColumnDescriptor) -> ColumnarError {
    ColumnarError::UnsupportedLogicalType(format!(
        "column '{}' stored as {}",
        desc.name,
        desc.physical_description()
    ))
}

/// The Arrow type a column reads as when no type is requested.
pub fn default_logical_type(desc: &ColumnDescriptor, config: &ReaderConfig) -> Result<DataType, ColumnarError> {
    use ColumnAnnotation as A;
    use PhysicalType as P;
    Ok(match (desc.physical_type, desc.annotation()) {
        (P::Boolean, _) => DataType::Boolean,

        (P::Int32, A::None) => DataType::Int32,
        (P::Int32, A::Int { bit_width: 8, signed: true }) => DataType::Int8,
        (P::Int32, A::Int { bit_width: 16, signed: true }) => DataType::Int16,
        (P::Int32, A::Int { bit_width: 32, signed: true }) => DataType::Int32,
        (P::Int32, A::Int { bit_width: 8, signed: false }) => DataType::Int16,
        (P::Int32, A::Int { bit_width: 16, signed: false }) => DataType::Int32,
        (P::Int32, A::Int { bit_width: 32, signed: false }) => DataType::Int64,
        (P::Int32, A::Date) => DataType::Date32,

        (P::Int64, A::None | A::Int { bit_width: 64, signed: true }) => DataType::Int64,
        (P::Int64, A::Int { bit_width: 64, signed: false }) => DataType::Decimal128(20, 0),
        (P::Int64, A::TimestampMillis | A::TimestampMicros) => {
            DataType::Timestamp(ArrowTimeUnit::Microsecond, None)
        }

        (P::Int32 | P::Int64 | P::ByteArray | P::FixedLenByteArray, A::Decimal { precision, scale }) => {
            DataType::Decimal128(precision, scale)
        }

        (P::Float, A::None) => DataType::Float32,
        (P::Double, A::None) => DataType::Float64,

        (P::ByteArray, A::None) if config.binary_as_string => DataType::Utf8,
        (P::ByteArray, A::None | A::Bson) => DataType::Binary,
        (P::ByteArray, A::Utf8 | A::Json | A::Enum) => DataType::Utf8,

        (P::FixedLenByteArray, A::None) => DataType::Binary,

        (P::Int96, _) | (_, A::Nested) => {
            return Err(ColumnarError::UnsupportedType(format!(
                "column '{}' stored as {}",
                desc.name,
                desc.physical_description()
            )))
        }
        _ => return Err(unsupported_annotation(desc)),
    })
}

//==================================================================================
// 3. Compatibility Table
//==================================================================================

fn signed_int_bits(data_type: &DataType) -> Option<u8> {
    match data_type {
        DataType::Int8 => Some(8),
        DataType::Int16 => Some(16),
        DataType::Int32 => Some(32),
        DataType::Int64 => Some(64),
        _ => None,
    }
}

fn decimal_fits(requested: &DataType, precision: u8, scale: i8) -> bool {
    matches!(requested, DataType::Decimal128(p, s) if *s == scale && *p >= precision)
}

/// Checks that `desc` can produce `requested`, failing with `SchemaIncompatible`.
pub fn check_compatible(
    desc: &ColumnDescriptor,
    requested: &DataType,
    config: &ReaderConfig,
) -> Result<(), ColumnarError> {
    use ColumnAnnotation as A;
    use PhysicalType as P;

    let widening = config.allow_type_widening;
    let compatible = match (desc.physical_type, desc.annotation()) {
        (P::Int96, _) | (_, A::Nested) => {
            return Err(ColumnarError::UnsupportedType(format!(
                "column '{}' stored as {}",
                desc.name,
                desc.physical_description()
            )))
        }
        (_, A::TimestampNanos | A::Time | A::Uuid | A::Interval | A::Unrecognized(_)) => {
            return Err(unsupported_annotation(desc))
        }

        (P::Boolean, _) => requested == &DataType::Boolean,

        (P::Int32, A::None) => match requested {
            DataType::Int32 => true,
            DataType::Int64 | DataType::Float64 => widening,
            DataType::Decimal128(_, _) => config.tolerate_unannotated_decimal,
            _ => false,
        },
        (P::Int64, A::None) => match requested {
            DataType::Int64 => true,
            DataType::Decimal128(_, _) => config.tolerate_unannotated_decimal,
            _ => false,
        },
        (P::Int32 | P::Int64, A::Int { bit_width, signed: true }) => match signed_int_bits(requested) {
            Some(bits) => bits >= bit_width,
            None => widening && desc.physical_type == P::Int32 && requested == &DataType::Float64,
        },
        (P::Int64, A::Int { bit_width: 64, signed: false }) => decimal_fits(requested, 20, 0),
        (P::Int32, A::Int { bit_width, signed: false }) => {
            signed_int_bits(requested).is_some_and(|bits| bits > bit_width)
        }
        (P::Int32, A::Date) => requested == &DataType::Date32,
        (P::Int64, A::TimestampMicros) => {
            matches!(requested, DataType::Timestamp(ArrowTimeUnit::Microsecond, _))
        }
        (P::Int64, A::TimestampMillis) => matches!(
            requested,
            DataType::Timestamp(ArrowTimeUnit::Microsecond | ArrowTimeUnit::Millisecond, _)
        ),
        (P::Int32 | P::Int64 | P::ByteArray | P::FixedLenByteArray, A::Decimal { precision, scale }) => {
            decimal_fits(requested, precision, scale)
        }

        (P::Float, A::None) => {
            requested == &DataType::Float32 || (widening && requested == &DataType::Float64)
        }
        (P::Double, A::None) => requested == &DataType::Float64,

        (P::ByteArray, A::None | A::Utf8 | A::Json | A::Enum | A::Bson) => {
            matches!(requested, DataType::Utf8 | DataType::Binary)
        }
        (P::FixedLenByteArray, A::None) => match requested {
            DataType::Binary => true,
            DataType::FixedSizeBinary(width) => *width as usize == desc.type_length(),
            _ => false,
        },

        _ => false,
    };

    if compatible {
        Ok(())
    } else {
        Err(ColumnarError::SchemaIncompatible {
            column: desc.name.clone(),
            physical: desc.physical_description(),
            requested: format!("{}", requested),
        })
    }
}

//==================================================================================
// 4. Reconciliation
//==================================================================================

/// Resolves every requested field against the file schema and partition values.
pub fn reconcile(
    physical: &ParquetSchema,
    requested: &Schema,
    partitions: &HashMap<String, PartitionValue>,
    config: &ReaderConfig,
) -> Result<ResolvedSchema, ColumnarError> {
    let mut fields = Vec::with_capacity(requested.fields().len());
    for field in requested.fields() {
        let resolved = if let Some(value) = partitions.get(field.name()) {
            if !value.can_produce(field.data_type()) {
                return Err(ColumnarError::SchemaIncompatible {
                    column: field.name().clone(),
                    physical: format!("partition value {}", value.data_type()),
                    requested: format!("{}", field.data_type()),
                });
            }
            let nullable = field.is_nullable() || matches!(value, PartitionValue::Null);
            ResolvedField {
                field: Arc::new(with_nullability(field, nullable)),
                source: ColumnSource::Partition(value.clone()),
            }
        } else if let Some(index) = physical.index_of(field.name()) {
            let desc = &physical.columns()[index];
            check_compatible(desc, field.data_type(), config)?;
            ResolvedField {
                field: Arc::new(with_nullability(field, field.is_nullable() || desc.is_optional())),
                source: ColumnSource::File(index),
            }
        } else {
            log::debug!("Requested column '{}' is absent from the file; filling with nulls", field.name());
            ResolvedField {
                field: Arc::new(with_nullability(field, true)),
                source: ColumnSource::Missing,
            }
        };
        fields.push(resolved);
    }
    Ok(ResolvedSchema { fields })
}

fn with_nullability(field: &Field, nullable: bool) -> Field {
    field.clone().with_nullable(nullable)
}

//==================================================================================
// 5. Unit Tests
//==================================================================================
