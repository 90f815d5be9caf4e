// In: src/types/logical.rs

//! The logical schema embedded in the footer's key/value metadata.
//!
//! Two textual forms exist in the wild. The current one is a JSON document:
//!
//! ```text
//! {"type":"struct","fields":[{"name":"a","type":"integer","nullable":true,"metadata":{}}]}
//! ```
//!
//! Older writers stored a case-class rendering instead:
//!
//! ```text
//! StructType(List(StructField(a,IntegerType,true),StructField(b,DecimalType(9,1),false)))
//! ```
//!
//! Both are parsed into a flat list of Arrow fields. Nested types are not
//! representable here and make the parse fail, which sends the reader down the
//! annotation-derived path.

use arrow::datatypes::{DataType, Schema, TimeUnit as ArrowTimeUnit};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ColumnarError;

/// The key/value metadata key under which the logical schema is stored.
pub const LOGICAL_SCHEMA_KEY: &str = "org.apache.spark.sql.parquet.row.metadata";

//==================================================================================
// 1. Wire Representation
//==================================================================================

#[derive(Serialize, Deserialize, Debug)]
struct StructTypeJson {
    #[serde(rename = "type")]
    type_name: String,
    fields: Vec<StructFieldJson>,
}

#[derive(Serialize, Deserialize, Debug)]
struct StructFieldJson {
    name: String,
    #[serde(rename = "type")]
    data_type: Value,
    nullable: bool,
    #[serde(default)]
    metadata: Map<String, Value>,
}

//==================================================================================
// 2. Logical Schema Model
//==================================================================================

/// A flat logical field as recorded by the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogicalSchema {
    pub fields: Vec<LogicalField>,
}

impl LogicalSchema {
    /// Parses the JSON form.
    pub fn from_json(text: &str) -> Result<Self, ColumnarError> {
        let parsed: StructTypeJson = serde_json::from_str(text)?;
        if parsed.type_name != "struct" {
            return Err(ColumnarError::UnsupportedLogicalType(format!(
                "top-level logical type must be 'struct', found '{}'",
                parsed.type_name
            )));
        }

        let mut fields = Vec::with_capacity(parsed.fields.len());
        for field in parsed.fields {
            let data_type = match &field.data_type {
                Value::String(name) => parse_type_name(name)?,
                other => {
                    return Err(ColumnarError::UnsupportedLogicalType(format!(
                        "nested logical type for field '{}': {}",
                        field.name, other
                    )))
                }
            };
            let metadata = field
                .metadata
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect();
            fields.push(LogicalField {
                name: field.name,
                data_type,
                nullable: field.nullable,
                metadata,
            });
        }
        Ok(Self { fields })
    }

    /// Renders the JSON form.
    pub fn to_json(&self) -> Result<String, ColumnarError> {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                Ok(StructFieldJson {
                    name: f.name.clone(),
                    data_type: Value::String(type_name(&f.data_type)?),
                    nullable: f.nullable,
                    metadata: f
                        .metadata
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, ColumnarError>>()?;
        let doc = StructTypeJson {
            type_name: "struct".to_string(),
            fields,
        };
        Ok(serde_json::to_string(&doc)?)
    }

    /// Parses the legacy `StructType(List(StructField(...),...))` form.
    pub fn parse_legacy(text: &str) -> Result<Self, ColumnarError> {
        let body = strip_call(text.trim(), "StructType").ok_or_else(|| {
            ColumnarError::UnsupportedLogicalType("legacy schema must start with StructType(".into())
        })?;
        // Older renderings omit the `List(...)` wrapper.
        let body = strip_call(body.trim(), "List").unwrap_or(body);

        let mut fields = Vec::new();
        for item in split_top_level(body) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let inner = strip_call(item, "StructField").ok_or_else(|| {
                ColumnarError::UnsupportedLogicalType(format!("expected StructField, found '{}'", item))
            })?;
            let parts = split_top_level(inner);
            if parts.len() < 3 {
                return Err(ColumnarError::UnsupportedLogicalType(format!(
                    "StructField needs name, type and nullability: '{}'",
                    item
                )));
            }
            // Names may themselves contain commas, so type and nullability are taken from the right.
            let nullable = match parts[parts.len() - 1].trim() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(ColumnarError::UnsupportedLogicalType(format!(
                        "invalid nullability '{}'",
                        other
                    )))
                }
            };
            let data_type = parse_legacy_type_name(parts[parts.len() - 2].trim())?;
            let name = parts[..parts.len() - 2].join(",");
            fields.push(LogicalField {
                name,
                data_type,
                nullable,
                metadata: HashMap::new(),
            });
        }
        Ok(Self { fields })
    }

    /// Builds the logical schema a writer embeds for an Arrow schema.
    pub fn from_arrow(schema: &Schema) -> Result<Self, ColumnarError> {
        let fields = schema
            .fields()
            .iter()
            .map(|f| {
                Ok(LogicalField {
                    name: f.name().clone(),
                    data_type: read_back_type(f.data_type())?,
                    nullable: f.is_nullable(),
                    metadata: f.metadata().clone(),
                })
            })
            .collect::<Result<Vec<_>, ColumnarError>>()?;
        Ok(Self { fields })
    }
}

//==================================================================================
// 3. Type Name Mapping
//==================================================================================

/// The Arrow type a reader produces for a written Arrow type. Unsigned integers
/// widen into the next signed type, and every timestamp resolution reads back as
/// microseconds.
pub fn read_back_type(data_type: &DataType) -> Result<DataType, ColumnarError> {
    Ok(match data_type {
        DataType::Boolean => DataType::Boolean,
        DataType::Int8 => DataType::Int8,
        DataType::Int16 | DataType::UInt8 => DataType::Int16,
        DataType::Int32 | DataType::UInt16 => DataType::Int32,
        DataType::Int64 | DataType::UInt32 => DataType::Int64,
        DataType::UInt64 => DataType::Decimal128(20, 0),
        DataType::Float32 => DataType::Float32,
        DataType::Float64 => DataType::Float64,
        DataType::Date32 => DataType::Date32,
        DataType::Timestamp(ArrowTimeUnit::Millisecond, _)
        | DataType::Timestamp(ArrowTimeUnit::Microsecond, _) => {
            DataType::Timestamp(ArrowTimeUnit::Microsecond, None)
        }
        DataType::Decimal128(p, s) => DataType::Decimal128(*p, *s),
        DataType::Utf8 | DataType::LargeUtf8 => DataType::Utf8,
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => DataType::Binary,
        other => {
            return Err(ColumnarError::UnsupportedType(format!(
                "no logical type name for {:?}",
                other
            )))
        }
    })
}

/// Renders the JSON type name of a read-back Arrow type.
pub fn type_name(data_type: &DataType) -> Result<String, ColumnarError> {
    Ok(match read_back_type(data_type)? {
        DataType::Boolean => "boolean".to_string(),
        DataType::Int8 => "byte".to_string(),
        DataType::Int16 => "short".to_string(),
        DataType::Int32 => "integer".to_string(),
        DataType::Int64 => "long".to_string(),
        DataType::Float32 => "float".to_string(),
        DataType::Float64 => "double".to_string(),
        DataType::Date32 => "date".to_string(),
        DataType::Timestamp(_, _) => "timestamp".to_string(),
        DataType::Decimal128(p, s) => format!("decimal({},{})", p, s),
        DataType::Utf8 => "string".to_string(),
        DataType::Binary => "binary".to_string(),
        other => {
            return Err(ColumnarError::InternalError(format!(
                "read_back_type produced unnamed type {:?}",
                other
            )))
        }
    })
}

/// Parses a JSON type name.
pub fn parse_type_name(name: &str) -> Result<DataType, ColumnarError> {
    let name = name.trim();
    Ok(match name {
        "boolean" => DataType::Boolean,
        "byte" => DataType::Int8,
        "short" => DataType::Int16,
        "integer" => DataType::Int32,
        "long" => DataType::Int64,
        "float" => DataType::Float32,
        "double" => DataType::Float64,
        "string" => DataType::Utf8,
        "binary" => DataType::Binary,
        "date" => DataType::Date32,
        "timestamp" | "timestamp_ntz" => DataType::Timestamp(ArrowTimeUnit::Microsecond, None),
        "decimal" => DataType::Decimal128(10, 0),
        other => match parse_decimal_args(other, "decimal") {
            Some((p, s)) => decimal_type(p, s)?,
            None => return Err(ColumnarError::UnsupportedLogicalType(other.to_string())),
        },
    })
}

fn parse_legacy_type_name(name: &str) -> Result<DataType, ColumnarError> {
    Ok(match name {
        "BooleanType" => DataType::Boolean,
        "ByteType" => DataType::Int8,
        "ShortType" => DataType::Int16,
        "IntegerType" => DataType::Int32,
        "LongType" => DataType::Int64,
        "FloatType" => DataType::Float32,
        "DoubleType" => DataType::Float64,
        "StringType" => DataType::Utf8,
        "BinaryType" => DataType::Binary,
        "DateType" => DataType::Date32,
        "TimestampType" => DataType::Timestamp(ArrowTimeUnit::Microsecond, None),
        other => match parse_decimal_args(other, "DecimalType") {
            Some((p, s)) => decimal_type(p, s)?,
            None => return Err(ColumnarError::UnsupportedLogicalType(other.to_string())),
        },
    })
}

fn decimal_type(precision: u8, scale: i8) -> Result<DataType, ColumnarError> {
    if precision == 0 || precision > 38 || scale < 0 || scale as u8 > precision {
        return Err(ColumnarError::UnsupportedLogicalType(format!(
            "decimal({},{})",
            precision, scale
        )));
    }
    Ok(DataType::Decimal128(precision, scale))
}

/// Parses `prefix(p,s)` into its two arguments.
fn parse_decimal_args(text: &str, prefix: &str) -> Option<(u8, i8)> {
    let args = strip_call(text, prefix)?;
    let (p, s) = args.split_once(',')?;
    Some((p.trim().parse().ok()?, s.trim().parse().ok()?))
}

/// Returns the argument text of `name(...)`.
fn strip_call<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
