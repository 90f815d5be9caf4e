//! Resolving a file's logical schema.
//!
//! The footer may carry the writer's logical schema under
//! [`LOGICAL_SCHEMA_KEY`](crate::types::LOGICAL_SCHEMA_KEY). It is advisory:
//! it is used only if it parses (JSON first, then the legacy rendering) and
//! agrees with the physical columns in count, names, order and compatibility.
//! Anything else is logged and the schema is derived from the column
//! annotations instead. A bad embedded schema never fails a read.

use arrow::datatypes::{Field, Schema};
use serde::Serialize;

use crate::config::ReaderConfig;
use crate::error::ColumnarError;
use crate::metadata::FileMetaData;
use crate::schema::{check_compatible, default_logical_type, ParquetSchema};
use crate::types::{LogicalSchema, LOGICAL_SCHEMA_KEY};

/// Where the resolved logical schema came from.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchemaResolution {
    Embedded,
    EmbeddedLegacy,
    Derived,
}

/// Returns the logical schema of a file together with its origin.
pub fn resolve_file_schema(
    metadata: &FileMetaData,
    physical: &ParquetSchema,
    config: &ReaderConfig,
) -> Result<(Schema, SchemaResolution), ColumnarError> {
    if let Some(text) = metadata.metadata_value(LOGICAL_SCHEMA_KEY) {
        let parsed = LogicalSchema::from_json(text)
            .map(|s| (s, SchemaResolution::Embedded))
            .or_else(|json_err| {
                LogicalSchema::parse_legacy(text)
                    .map(|s| (s, SchemaResolution::EmbeddedLegacy))
                    .map_err(|_| json_err)
            });
        match parsed {
            Ok((logical, resolution)) => match consistent_schema(&logical, physical, config) {
                Ok(schema) => return Ok((schema, resolution)),
                Err(reason) => log::warn!(
                    "Embedded logical schema disagrees with the file columns ({}); deriving from annotations",
                    reason
                ),
            },
            Err(e) => log::warn!("Embedded logical schema is unparseable ({}); deriving from annotations", e),
        }
    }
    Ok((derive_schema(physical, config), SchemaResolution::Derived))
}

/// Checks the embedded schema against the physical columns, returning the Arrow schema on success.
fn consistent_schema(
    logical: &LogicalSchema,
    physical: &ParquetSchema,
    config: &ReaderConfig,
) -> Result<Schema, ColumnarError> {
    if logical.fields.len() != physical.num_columns() {
        return Err(ColumnarError::InvalidData(format!(
            "{} logical fields for {} columns",
            logical.fields.len(),
            physical.num_columns()
        )));
    }
    let mut fields = Vec::with_capacity(logical.fields.len());
    for (field, desc) in logical.fields.iter().zip(physical.columns()) {
        if field.name != desc.name {
            return Err(ColumnarError::InvalidData(format!(
                "logical field '{}' sits where column '{}' is stored",
                field.name, desc.name
            )));
        }
        check_compatible(desc, &field.data_type, config)?;
        fields.push(
            Field::new(field.name.clone(), field.data_type.clone(), field.nullable || desc.is_optional())
                .with_metadata(field.metadata.clone()),
        );
    }
    Ok(Schema::new(fields))
}

/// Derives one field per readable column. Unreadable columns are left out with a warning.
fn derive_schema(physical: &ParquetSchema, config: &ReaderConfig) -> Schema {
    let fields = physical
        .columns()
        .iter()
        .filter_map(|desc| match default_logical_type(desc, config) {
            Ok(data_type) => Some(Field::new(desc.name.clone(), data_type, desc.is_optional())),
            Err(e) => {
                log::warn!("Column '{}' has no logical mapping and is skipped: {}", desc.name, e);
                None
            }
        })
        .collect::<Vec<_>>();
    Schema::new(fields)
}
