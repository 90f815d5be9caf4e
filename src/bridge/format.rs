// In: src/bridge/format.rs

//! Serializable summaries of a file's footer, as produced by
//! [`inspect_file`](crate::bridge::inspect_file).
//!
//! These are a read-only view for tooling and debugging: per-column encodings,
//! codecs, sizes and statistics, plus the path taken to resolve the logical
//! schema. They are never written to a file.

use arrow::datatypes::Schema;
use serde::Serialize;

use crate::error::ColumnarError;
use crate::metadata::{ColumnChunk, FileMetaData, RowGroup};
use crate::schema::{ColumnDescriptor, ParquetSchema, SchemaResolution};
use crate::types::{CompressionCodec, Encoding, PhysicalType, Repetition};

//==================================================================================
// I. File-Level Summary
//==================================================================================

#[derive(Serialize, Debug, Clone)]
pub struct FileSummary {
    pub version: i32,
    pub created_by: Option<String>,
    pub num_rows: i64,
    pub schema_resolution: SchemaResolution,
    /// The resolved logical schema.
    pub schema: Schema,
    pub columns: Vec<ColumnSummary>,
    pub row_groups: Vec<RowGroupSummary>,
    pub key_value_metadata: Vec<(String, Option<String>)>,
}

/// One physical leaf column.
#[derive(Serialize, Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub physical_type: PhysicalType,
    pub repetition: Repetition,
    /// e.g. `INT64 (DECIMAL(9,1))`.
    pub storage: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct RowGroupSummary {
    pub ordinal: usize,
    pub num_rows: i64,
    pub total_byte_size: i64,
    pub total_compressed_size: i64,
    pub columns: Vec<ColumnChunkSummary>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ColumnChunkSummary {
    pub column: String,
    pub codec: CompressionCodec,
    pub encodings: Vec<Encoding>,
    pub num_values: i64,
    pub compressed_size: i64,
    pub uncompressed_size: i64,
    pub dictionary_page_offset: Option<i64>,
    pub data_page_offset: i64,
    pub null_count: Option<i64>,
    /// Raw statistics bytes, hex-encoded.
    pub min_value: Option<String>,
    pub max_value: Option<String>,
}

//==================================================================================
// II. Construction
//==================================================================================

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl ColumnSummary {
    fn from_descriptor(desc: &ColumnDescriptor) -> Self {
        Self {
            name: desc.name.clone(),
            physical_type: desc.physical_type,
            repetition: desc.repetition,
            storage: desc.physical_description(),
        }
    }
}

impl ColumnChunkSummary {
    fn from_chunk(chunk: &ColumnChunk) -> Result<Self, ColumnarError> {
        let meta = chunk
            .meta_data
            .as_ref()
            .ok_or_else(|| ColumnarError::MalformedFooter("column chunk without metadata".to_string()))?;
        let stats = meta.statistics.as_ref();
        Ok(Self {
            column: meta.path_in_schema.join("."),
            codec: meta.codec,
            encodings: meta.encodings.clone(),
            num_values: meta.num_values,
            compressed_size: meta.total_compressed_size,
            uncompressed_size: meta.total_uncompressed_size,
            dictionary_page_offset: meta.dictionary_page_offset,
            data_page_offset: meta.data_page_offset,
            null_count: stats.and_then(|s| s.null_count),
            min_value: stats.and_then(|s| s.min_value.as_deref()).map(hex),
            max_value: stats.and_then(|s| s.max_value.as_deref()).map(hex),
        })
    }
}

impl RowGroupSummary {
    fn from_row_group(ordinal: usize, row_group: &RowGroup) -> Result<Self, ColumnarError> {
        let columns = row_group
            .columns
            .iter()
            .map(ColumnChunkSummary::from_chunk)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ordinal,
            num_rows: row_group.num_rows,
            total_byte_size: row_group.total_byte_size,
            total_compressed_size: row_group
                .total_compressed_size
                .unwrap_or_else(|| columns.iter().map(|c| c.compressed_size).sum()),
            columns,
        })
    }
}

impl FileSummary {
    pub fn new(
        metadata: &FileMetaData,
        physical: &ParquetSchema,
        schema: Schema,
        schema_resolution: SchemaResolution,
    ) -> Result<Self, ColumnarError> {
        let row_groups = metadata
            .row_groups
            .iter()
            .enumerate()
            .map(|(i, rg)| RowGroupSummary::from_row_group(i, rg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            version: metadata.version,
            created_by: metadata.created_by.clone(),
            num_rows: metadata.num_rows,
            schema_resolution,
            schema,
            columns: physical.columns().iter().map(ColumnSummary::from_descriptor).collect(),
            row_groups,
            key_value_metadata: metadata
                .key_value_metadata
                .iter()
                .map(|kv| (kv.key.clone(), kv.value.clone()))
                .collect(),
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, ColumnarError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_rendering() {
        assert_eq!(hex(&[0x00, 0x0f, 0xab]), "000fab");
        assert_eq!(hex(&[]), "");
    }
}
