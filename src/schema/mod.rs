//! The physical schema model and everything that maps it to logical types.
//!
//! A file's schema is a root element followed by flat leaf columns. Each leaf
//! becomes a [`ColumnDescriptor`] that folds its converted type and logical type
//! union into one [`ColumnAnnotation`]. The sub-modules build on that:
//!
//! - `reconcile`: default derivation and the compatibility table for requested types;
//! - `embedded`: the advisory logical schema stored in the footer, with fallback;
//! - `partition`: typed partition constants broadcast into output columns.

pub mod embedded;
pub mod partition;
pub mod reconcile;

use arrow::datatypes::{DataType, Field, Schema, TimeUnit as ArrowTimeUnit};

use crate::config::{DecimalStorage, WriterConfig};
use crate::error::ColumnarError;
use crate::metadata::SchemaElement;
use crate::types::{
    ColumnAnnotation, ConvertedType, LogicalTypeAnnotation, PhysicalType, Repetition, SortOrder, TimeUnit,
};
use crate::utils;

pub use embedded::{resolve_file_schema, SchemaResolution};
pub use partition::PartitionValue;
pub use reconcile::{check_compatible, default_logical_type, reconcile, ColumnSource, ResolvedField, ResolvedSchema};

/// Name of the root schema element written by this codec.
pub const ROOT_NAME: &str = "spark_schema";

/// Field metadata key selecting a string or binary annotation on write.
pub const LOGICAL_TYPE_METADATA_KEY: &str = "parquet.logical_type";

//==================================================================================
// 1. Column Descriptor
//==================================================================================

/// One flat leaf column: its storage type plus the annotation that gives it meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub physical_type: PhysicalType,
    pub type_length: Option<i32>,
    pub repetition: Repetition,
    pub converted_type: Option<ConvertedType>,
    pub logical_type: Option<LogicalTypeAnnotation>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    annotation: ColumnAnnotation,
}

impl ColumnDescriptor {
    /// Builds a descriptor, folding and validating its annotations.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        physical_type: PhysicalType,
        type_length: Option<i32>,
        repetition: Repetition,
        converted_type: Option<ConvertedType>,
        logical_type: Option<LogicalTypeAnnotation>,
        precision: Option<i32>,
        scale: Option<i32>,
    ) -> Result<Self, ColumnarError> {
        let name = name.into();
        let annotation = fold_annotation(&name, converted_type, logical_type, precision, scale)?;
        let desc = Self {
            name,
            physical_type,
            type_length,
            repetition,
            converted_type,
            logical_type,
            precision,
            scale,
            annotation,
        };
        desc.validate()?;
        Ok(desc)
    }

    pub fn annotation(&self) -> ColumnAnnotation {
        self.annotation
    }

    pub fn is_optional(&self) -> bool {
        self.repetition == Repetition::Optional
    }

    /// The PLAIN width for FIXED_LEN_BYTE_ARRAY, 0 for every other type.
    pub fn type_length(&self) -> usize {
        match self.physical_type {
            PhysicalType::FixedLenByteArray => self.type_length.unwrap_or(0).max(0) as usize,
            _ => 0,
        }
    }

    /// Ordering used for min/max statistics.
    pub fn sort_order(&self) -> SortOrder {
        match (self.physical_type, self.annotation) {
            (_, ColumnAnnotation::Int { signed: false, .. }) => SortOrder::Unsigned,
            (_, ColumnAnnotation::Decimal { .. }) => SortOrder::Signed,
            (PhysicalType::ByteArray | PhysicalType::FixedLenByteArray | PhysicalType::Boolean, _) => {
                SortOrder::Unsigned
            }
            _ => SortOrder::Signed,
        }
    }

    /// Human-readable storage description used in error messages, e.g. `INT64 (DECIMAL(9,1))`.
    pub fn physical_description(&self) -> String {
        let physical = match self.physical_type {
            PhysicalType::FixedLenByteArray => format!("FIXED_LEN_BYTE_ARRAY({})", self.type_length()),
            other => other.to_string(),
        };
        match self.annotation {
            ColumnAnnotation::None => physical,
            annotation => format!("{} ({})", physical, annotation),
        }
    }

    /// Decimal precision must fit the storage width.
    fn validate(&self) -> Result<(), ColumnarError> {
        if self.repetition == Repetition::Repeated {
            return Err(ColumnarError::UnsupportedType(format!(
                "repeated column '{}' (repetition levels are not supported)",
                self.name
            )));
        }
        if self.physical_type == PhysicalType::FixedLenByteArray && self.type_length.unwrap_or(0) <= 0 {
            return Err(ColumnarError::InvalidData(format!(
                "FIXED_LEN_BYTE_ARRAY column '{}' has no positive type_length",
                self.name
            )));
        }
        if let ColumnAnnotation::Decimal { precision, scale } = self.annotation {
            let max_precision = match self.physical_type {
                PhysicalType::Int32 => 9,
                PhysicalType::Int64 => 18,
                PhysicalType::FixedLenByteArray => utils::max_precision_for_length(self.type_length()),
                PhysicalType::ByteArray => 38,
                other => {
                    return Err(ColumnarError::InvalidData(format!(
                        "column '{}': DECIMAL cannot annotate {}",
                        self.name, other
                    )))
                }
            };
            if precision == 0 || precision > max_precision || scale < 0 || scale as u8 > precision {
                return Err(ColumnarError::InvalidData(format!(
                    "column '{}': DECIMAL({},{}) does not fit {} (max precision {})",
                    self.name, precision, scale, self.physical_type, max_precision
                )));
            }
        }
        Ok(())
    }

    pub fn from_schema_element(element: &SchemaElement) -> Result<Self, ColumnarError> {
        if element.num_children.unwrap_or(0) > 0 {
            return Err(ColumnarError::UnsupportedType(format!(
                "nested group '{}' (only flat schemas are supported)",
                element.name
            )));
        }
        let physical_type = element.physical_type.ok_or_else(|| {
            ColumnarError::InvalidData(format!("leaf '{}' has no physical type", element.name))
        })?;
        Self::new(
            element.name.clone(),
            physical_type,
            element.type_length,
            element.repetition_type.unwrap_or(Repetition::Optional),
            element.converted_type,
            element.logical_type,
            element.precision,
            element.scale,
        )
    }

    pub fn to_schema_element(&self) -> SchemaElement {
        SchemaElement {
            physical_type: Some(self.physical_type),
            type_length: self.type_length,
            repetition_type: Some(self.repetition),
            name: self.name.clone(),
            num_children: None,
            converted_type: self.converted_type,
            scale: self.scale,
            precision: self.precision,
            field_id: None,
            logical_type: self.logical_type,
        }
    }

    /// The storage chosen for an Arrow field on write.
    pub fn from_arrow_field(field: &Field, config: &WriterConfig) -> Result<Self, ColumnarError> {
        let repetition = if field.is_nullable() {
            Repetition::Optional
        } else {
            Repetition::Required
        };
        let hint = field.metadata().get(LOGICAL_TYPE_METADATA_KEY).map(String::as_str);

        use ConvertedType as C;
        use PhysicalType as P;
        let (physical, type_length, converted, precision_scale) = match field.data_type() {
            DataType::Boolean => (P::Boolean, None, None, None),
            DataType::Int8 => (P::Int32, None, Some(C::Int8), None),
            DataType::Int16 => (P::Int32, None, Some(C::Int16), None),
            DataType::Int32 => (P::Int32, None, None, None),
            DataType::Int64 => (P::Int64, None, None, None),
            DataType::UInt8 => (P::Int32, None, Some(C::Uint8), None),
            DataType::UInt16 => (P::Int32, None, Some(C::Uint16), None),
            DataType::UInt32 => (P::Int32, None, Some(C::Uint32), None),
            DataType::UInt64 => (P::Int64, None, Some(C::Uint64), None),
            DataType::Float32 => (P::Float, None, None, None),
            DataType::Float64 => (P::Double, None, None, None),
            DataType::Date32 => (P::Int32, None, Some(C::Date), None),
            DataType::Timestamp(ArrowTimeUnit::Millisecond, _) => (P::Int64, None, Some(C::TimestampMillis), None),
            DataType::Timestamp(ArrowTimeUnit::Microsecond, _) => (P::Int64, None, Some(C::TimestampMicros), None),
            DataType::Decimal128(precision, scale) => {
                if *scale < 0 {
                    return Err(ColumnarError::UnsupportedType(format!(
                        "negative decimal scale on '{}'",
                        field.name()
                    )));
                }
                let (physical, type_length) = decimal_storage(*precision, config.decimal_storage);
                (physical, type_length, Some(C::Decimal), Some((*precision as i32, *scale as i32)))
            }
            DataType::Utf8 | DataType::LargeUtf8 => {
                let converted = match hint {
                    Some("json") => C::Json,
                    Some("enum") => C::Enum,
                    _ => C::Utf8,
                };
                (P::ByteArray, None, Some(converted), None)
            }
            DataType::Binary | DataType::LargeBinary => {
                let converted = match hint {
                    Some("bson") => Some(C::Bson),
                    _ => None,
                };
                (P::ByteArray, None, converted, None)
            }
            DataType::FixedSizeBinary(width) => (P::FixedLenByteArray, Some(*width), None, None),
            other => {
                return Err(ColumnarError::UnsupportedType(format!(
                    "cannot write field '{}' of type {:?}",
                    field.name(),
                    other
                )))
            }
        };

        let logical_type = converted.and_then(|c| logical_type_for(c, precision_scale));
        Self::new(
            field.name().clone(),
            physical,
            type_length,
            repetition,
            converted,
            logical_type,
            precision_scale.map(|(p, _)| p),
            precision_scale.map(|(_, s)| s),
        )
    }
}

/// Physical storage for a decimal of `precision` under the configured policy.
fn decimal_storage(precision: u8, storage: DecimalStorage) -> (PhysicalType, Option<i32>) {
    let flba = || {
        (
            PhysicalType::FixedLenByteArray,
            Some(utils::min_length_for_precision(precision) as i32),
        )
    };
    match storage {
        DecimalStorage::Compact if precision <= 9 => (PhysicalType::Int32, None),
        DecimalStorage::Compact | DecimalStorage::Int64 if precision <= 18 => (PhysicalType::Int64, None),
        _ => flba(),
    }
}

/// The logical type union member written next to a converted type.
fn logical_type_for(converted: ConvertedType, precision_scale: Option<(i32, i32)>) -> Option<LogicalTypeAnnotation> {
    use ConvertedType as C;
    let integer = |bit_width: i8, signed: bool| Some(LogicalTypeAnnotation::Integer { bit_width, signed });
    match converted {
        C::Utf8 => Some(LogicalTypeAnnotation::String),
        C::Json => Some(LogicalTypeAnnotation::Json),
        C::Bson => Some(LogicalTypeAnnotation::Bson),
        C::Enum => Some(LogicalTypeAnnotation::Enum),
        C::Date => Some(LogicalTypeAnnotation::Date),
        C::Decimal => precision_scale.map(|(precision, scale)| LogicalTypeAnnotation::Decimal { scale, precision }),
        C::TimestampMillis => Some(LogicalTypeAnnotation::Timestamp {
            adjusted_to_utc: true,
            unit: TimeUnit::Millis,
        }),
        C::TimestampMicros => Some(LogicalTypeAnnotation::Timestamp {
            adjusted_to_utc: true,
            unit: TimeUnit::Micros,
        }),
        C::Int8 => integer(8, true),
        C::Int16 => integer(16, true),
        C::Int32 => integer(32, true),
        C::Int64 => integer(64, true),
        C::Uint8 => integer(8, false),
        C::Uint16 => integer(16, false),
        C::Uint32 => integer(32, false),
        C::Uint64 => integer(64, false),
        _ => None,
    }
}

/// Folds the converted type (preferred) or the logical type union into one annotation.
fn fold_annotation(
    name: &str,
    converted: Option<ConvertedType>,
    logical: Option<LogicalTypeAnnotation>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> Result<ColumnAnnotation, ColumnarError> {
    let decimal = |precision: Option<i32>, scale: Option<i32>| -> Result<ColumnAnnotation, ColumnarError> {
        let precision = precision.ok_or_else(|| {
            ColumnarError::InvalidData(format!("DECIMAL column '{}' has no precision", name))
        })?;
        let scale = scale.unwrap_or(0);
        Ok(ColumnAnnotation::Decimal {
            precision: u8::try_from(precision).unwrap_or(u8::MAX),
            scale: i8::try_from(scale).unwrap_or(i8::MIN),
        })
    };

    use ColumnAnnotation as A;
    if let Some(converted) = converted {
        use ConvertedType as C;
        return Ok(match converted {
            C::Utf8 => A::Utf8,
            C::Enum => A::Enum,
            C::Json => A::Json,
            C::Bson => A::Bson,
            C::Date => A::Date,
            C::TimeMillis | C::TimeMicros => A::Time,
            C::TimestampMillis => A::TimestampMillis,
            C::TimestampMicros => A::TimestampMicros,
            C::Decimal => decimal(precision, scale)?,
            C::Int8 => A::Int { bit_width: 8, signed: true },
            C::Int16 => A::Int { bit_width: 16, signed: true },
            C::Int32 => A::Int { bit_width: 32, signed: true },
            C::Int64 => A::Int { bit_width: 64, signed: true },
            C::Uint8 => A::Int { bit_width: 8, signed: false },
            C::Uint16 => A::Int { bit_width: 16, signed: false },
            C::Uint32 => A::Int { bit_width: 32, signed: false },
            C::Uint64 => A::Int { bit_width: 64, signed: false },
            C::Interval => A::Interval,
            C::Map | C::MapKeyValue | C::List => A::Nested,
        });
    }

    let Some(logical) = logical else {
        return Ok(A::None);
    };
    use LogicalTypeAnnotation as L;
    Ok(match logical {
        L::String => A::Utf8,
        L::Enum => A::Enum,
        L::Json => A::Json,
        L::Bson => A::Bson,
        L::Uuid => A::Uuid,
        L::Date => A::Date,
        L::Decimal { scale, precision } => decimal(Some(precision), Some(scale))?,
        L::Time { .. } => A::Time,
        L::Timestamp { unit: TimeUnit::Millis, .. } => A::TimestampMillis,
        L::Timestamp { unit: TimeUnit::Micros, .. } => A::TimestampMicros,
        L::Timestamp { unit: TimeUnit::Nanos, .. } => A::TimestampNanos,
        L::Integer { bit_width, signed } => A::Int {
            bit_width: u8::try_from(bit_width).unwrap_or(0),
            signed,
        },
        L::Map | L::List => A::Nested,
        // UNKNOWN marks an always-null column; its storage speaks for itself.
        L::Unknown => A::None,
        L::Other(id) => A::Unrecognized(id),
    })
}

//==================================================================================
// 2. Flat Schema
//==================================================================================

/// The physical schema of a file: an ordered list of flat leaf columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ParquetSchema {
    root_name: String,
    columns: Vec<ColumnDescriptor>,
}

impl ParquetSchema {
    pub fn new(root_name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            root_name: root_name.into(),
            columns,
        }
    }

    /// Parses the footer's schema elements. Nested schemas are rejected.
    pub fn from_elements(elements: &[SchemaElement]) -> Result<Self, ColumnarError> {
        let (root, leaves) = elements
            .split_first()
            .ok_or_else(|| ColumnarError::MalformedFooter("schema has no root element".to_string()))?;
        let declared = root.num_children.unwrap_or(0).max(0) as usize;
        if declared != leaves.len() {
            return Err(ColumnarError::UnsupportedType(format!(
                "root declares {} children but {} elements follow (nested schemas are not supported)",
                declared,
                leaves.len()
            )));
        }
        let columns = leaves
            .iter()
            .map(ColumnDescriptor::from_schema_element)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(root.name.clone(), columns))
    }

    pub fn to_elements(&self) -> Vec<SchemaElement> {
        let root = SchemaElement {
            name: self.root_name.clone(),
            num_children: Some(self.columns.len() as i32),
            ..Default::default()
        };
        std::iter::once(root)
            .chain(self.columns.iter().map(ColumnDescriptor::to_schema_element))
            .collect()
    }

    pub fn from_arrow(schema: &Schema, config: &WriterConfig) -> Result<Self, ColumnarError> {
        let columns = schema
            .fields()
            .iter()
            .map(|f| ColumnDescriptor::from_arrow_field(f, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(ROOT_NAME, columns))
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Position of the column named exactly `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_arrow_field_storage_choices() {
        let config = WriterConfig::default();
        let cases = [
            (DataType::Int8, PhysicalType::Int32, ColumnAnnotation::Int { bit_width: 8, signed: true }),
            (DataType::UInt32, PhysicalType::Int32, ColumnAnnotation::Int { bit_width: 32, signed: false }),
            (DataType::Date32, PhysicalType::Int32, ColumnAnnotation::Date),
            (
                DataType::Timestamp(ArrowTimeUnit::Millisecond, None),
                PhysicalType::Int64,
                ColumnAnnotation::TimestampMillis,
            ),
            (DataType::Utf8, PhysicalType::ByteArray, ColumnAnnotation::Utf8),
            (DataType::Binary, PhysicalType::ByteArray, ColumnAnnotation::None),
            (
                DataType::Decimal128(9, 1),
                PhysicalType::Int32,
                ColumnAnnotation::Decimal { precision: 9, scale: 1 },
            ),
            (
                DataType::Decimal128(20, 2),
                PhysicalType::FixedLenByteArray,
                ColumnAnnotation::Decimal { precision: 20, scale: 2 },
            ),
        ];
        for (data_type, physical, annotation) in cases {
            let field = Field::new("c", data_type.clone(), true);
            let desc = ColumnDescriptor::from_arrow_field(&field, &config).unwrap();
            assert_eq!(desc.physical_type, physical, "{:?}", data_type);
            assert_eq!(desc.annotation(), annotation, "{:?}", data_type);
            assert!(desc.is_optional());
        }
    }

    #[test]
    fn test_decimal_storage_policy() {
        let config = WriterConfig {
            decimal_storage: DecimalStorage::Int64,
            ..Default::default()
        };
        let field = Field::new("d", DataType::Decimal128(9, 1), false);
        let desc = ColumnDescriptor::from_arrow_field(&field, &config).unwrap();
        assert_eq!(desc.physical_type, PhysicalType::Int64);
        assert_eq!(desc.repetition, Repetition::Required);
        assert_eq!(desc.physical_description(), "INT64 (DECIMAL(9,1))");
    }

    #[test]
    fn test_decimal_precision_must_fit_width() {
        let result = ColumnDescriptor::new(
            "d",
            PhysicalType::Int32,
            None,
            Repetition::Optional,
            Some(ConvertedType::Decimal),
            None,
            Some(10),
            Some(0),
        );
        assert!(matches!(result, Err(ColumnarError::InvalidData(_))));

        let result = ColumnDescriptor::new(
            "d",
            PhysicalType::FixedLenByteArray,
            Some(4),
            Repetition::Optional,
            Some(ConvertedType::Decimal),
            None,
            Some(9),
            Some(2),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_logical_type_union_is_used_without_converted_type() {
        let desc = ColumnDescriptor::new(
            "ts",
            PhysicalType::Int64,
            None,
            Repetition::Optional,
            None,
            Some(LogicalTypeAnnotation::Timestamp {
                adjusted_to_utc: false,
                unit: TimeUnit::Nanos,
            }),
            None,
            None,
        )
        .unwrap();
        assert_eq!(desc.annotation(), ColumnAnnotation::TimestampNanos);
    }

    #[test]
    fn test_schema_elements_roundtrip() {
        let mut metadata = HashMap::new();
        metadata.insert(LOGICAL_TYPE_METADATA_KEY.to_string(), "json".to_string());
        let arrow = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("doc", DataType::Utf8, true).with_metadata(metadata),
        ]);
        let schema = ParquetSchema::from_arrow(&arrow, &WriterConfig::default()).unwrap();
        assert_eq!(schema.columns()[1].annotation(), ColumnAnnotation::Json);

        let elements = schema.to_elements();
        assert_eq!(elements[0].num_children, Some(2));
        let parsed = ParquetSchema::from_elements(&elements).unwrap();
        assert_eq!(parsed, schema);
        assert_eq!(parsed.index_of("doc"), Some(1));
        assert_eq!(parsed.index_of("DOC"), None);
    }

    #[test]
    fn test_nested_schema_is_rejected() {
        let elements = vec![
            SchemaElement {
                name: "root".into(),
                num_children: Some(1),
                ..Default::default()
            },
            SchemaElement {
                name: "group".into(),
                num_children: Some(1),
                repetition_type: Some(Repetition::Optional),
                ..Default::default()
            },
            SchemaElement {
                name: "leaf".into(),
                physical_type: Some(PhysicalType::Int32),
                repetition_type: Some(Repetition::Optional),
                ..Default::default()
            },
        ];
        let result = ParquetSchema::from_elements(&elements);
        assert!(matches!(result, Err(ColumnarError::UnsupportedType(_))));
    }

    #[test]
    fn test_unsigned_columns_sort_unsigned() {
        let field = Field::new("u", DataType::UInt16, true);
        let desc = ColumnDescriptor::from_arrow_field(&field, &WriterConfig::default()).unwrap();
        assert_eq!(desc.sort_order(), SortOrder::Unsigned);
        let field = Field::new("s", DataType::Utf8, true);
        let desc = ColumnDescriptor::from_arrow_field(&field, &WriterConfig::default()).unwrap();
        assert_eq!(desc.sort_order(), SortOrder::Unsigned);
    }
}
