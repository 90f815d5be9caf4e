// In: src/config.rs

//! The single source of truth for writer and reader configuration.
//!
//! Configs are created once at the application boundary (in code, or from a
//! JSON document) and then passed down through the system as a shared,
//! read-only `Arc`. Every field has a serde default, so a partial JSON document
//! is a valid config.

use serde::{Deserialize, Serialize};

use crate::error::ColumnarError;
use crate::types::CompressionCodec;

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// Page compression applied to every column chunk.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    Uncompressed,
    /// **Default:** fast, and the codec most readers expect.
    #[default]
    Snappy,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn codec(self) -> CompressionCodec {
        match self {
            Compression::Uncompressed => CompressionCodec::Uncompressed,
            Compression::Snappy => CompressionCodec::Snappy,
            Compression::Gzip => CompressionCodec::Gzip,
            Compression::Zstd => CompressionCodec::Zstd,
        }
    }
}

/// Selects the data page layout and the dictionary encoding tags.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriterVersion {
    /// `DATA_PAGE` headers; the whole page is compressed; dictionary pages and
    /// dictionary-encoded data pages are tagged `PLAIN_DICTIONARY`.
    #[default]
    V1,
    /// `DATA_PAGE_V2` headers; levels stay uncompressed; dictionary pages are
    /// tagged `PLAIN` and their data pages `RLE_DICTIONARY`.
    V2,
}

/// Physical storage chosen for Arrow `Decimal128` columns.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecimalStorage {
    /// **Default:** INT32 up to precision 9, INT64 up to 18, otherwise the
    /// narrowest FIXED_LEN_BYTE_ARRAY.
    #[default]
    Compact,
    /// INT64 up to precision 18 (including small precisions), otherwise
    /// FIXED_LEN_BYTE_ARRAY. Matches writers that never emit INT32 decimals.
    Int64,
    /// Always FIXED_LEN_BYTE_ARRAY, the legacy layout.
    FixedLenByteArray,
}

//==================================================================================
// II. Writer Configuration
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WriterConfig {
    #[serde(default)]
    pub compression: Compression,

    /// Codec level for GZIP and ZSTD. `None` uses the codec default.
    #[serde(default)]
    pub compression_level: Option<i32>,

    /// Start every eligible column chunk in dictionary mode.
    #[serde(default = "default_true")]
    pub dictionary_enabled: bool,

    /// Byte budget of one column chunk's dictionary (PLAIN size).
    #[serde(default = "default_page_size")]
    pub dictionary_page_size_limit: usize,

    /// When the first dictionary page is sealed and `distinct / values` exceeds
    /// this ratio, the chunk is written PLAIN instead.
    #[serde(default = "default_dictionary_fallback_ratio")]
    pub dictionary_fallback_ratio: f64,

    /// Target encoded size of one data page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum rows in one data page.
    #[serde(default = "default_data_page_row_count_limit")]
    pub data_page_row_count_limit: usize,

    /// Buffered Arrow bytes that trigger a row group flush.
    #[serde(default = "default_row_group_size_bytes")]
    pub row_group_size_bytes: usize,

    /// Buffered rows that trigger a row group flush.
    #[serde(default = "default_max_row_group_rows")]
    pub max_row_group_rows: usize,

    #[serde(default)]
    pub writer_version: WriterVersion,

    /// Write min/max statistics. Null counts are always written.
    #[serde(default = "default_true")]
    pub statistics_enabled: bool,

    #[serde(default)]
    pub decimal_storage: DecimalStorage,

    /// Embed the logical schema under `org.apache.spark.sql.parquet.row.metadata`.
    #[serde(default = "default_true")]
    pub embed_logical_schema: bool,

    #[serde(default = "default_created_by")]
    pub created_by: String,

    /// Extra key/value pairs written to the footer, in order.
    #[serde(default)]
    pub extra_metadata: Vec<(String, String)>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            compression_level: None,
            dictionary_enabled: true,
            dictionary_page_size_limit: default_page_size(),
            dictionary_fallback_ratio: default_dictionary_fallback_ratio(),
            page_size: default_page_size(),
            data_page_row_count_limit: default_data_page_row_count_limit(),
            row_group_size_bytes: default_row_group_size_bytes(),
            max_row_group_rows: default_max_row_group_rows(),
            writer_version: WriterVersion::default(),
            statistics_enabled: true,
            decimal_storage: DecimalStorage::default(),
            embed_logical_schema: true,
            created_by: default_created_by(),
            extra_metadata: Vec::new(),
        }
    }
}

impl WriterConfig {
    /// Rejects settings that cannot produce a readable file.
    pub fn validate(&self) -> Result<(), ColumnarError> {
        if self.page_size == 0 {
            return Err(ColumnarError::InvalidArgument("page_size must be positive".into()));
        }
        if self.data_page_row_count_limit == 0 {
            return Err(ColumnarError::InvalidArgument(
                "data_page_row_count_limit must be positive".into(),
            ));
        }
        if self.max_row_group_rows == 0 || self.row_group_size_bytes == 0 {
            return Err(ColumnarError::InvalidArgument(
                "row group limits must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dictionary_fallback_ratio) {
            return Err(ColumnarError::InvalidArgument(format!(
                "dictionary_fallback_ratio {} is outside 0..=1",
                self.dictionary_fallback_ratio
            )));
        }
        Ok(())
    }
}

//==================================================================================
// III. Reader Configuration
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    /// Maximum rows per output batch. Batches never span row groups.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Derive `Utf8` instead of `Binary` for unannotated BYTE_ARRAY columns.
    #[serde(default)]
    pub binary_as_string: bool,

    /// Permit INT32 -> Int64/Float64 and FLOAT -> Float64 reads.
    #[serde(default)]
    pub allow_type_widening: bool,

    /// Accept a requested decimal over an unannotated INT32/INT64 column,
    /// treating the stored integers as unscaled values.
    #[serde(default = "default_true")]
    pub tolerate_unannotated_decimal: bool,

    /// Decode the columns of a batch on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel_decode: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            binary_as_string: false,
            allow_type_widening: false,
            tolerate_unannotated_decimal: true,
            parallel_decode: true,
        }
    }
}

//==================================================================================
// IV. Combined Document
//==================================================================================

/// Both configs in one serde document, as loaded from a JSON file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CodecConfig {
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
}

impl CodecConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ColumnarError> {
        let config: CodecConfig = serde_json::from_str(text)?;
        config.writer.validate()?;
        if config.reader.batch_size == 0 {
            return Err(ColumnarError::InvalidArgument("batch_size must be positive".into()));
        }
        Ok(config)
    }
}

/// Helper for `serde` to default a boolean field to true.
fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    1024 * 1024
}

fn default_dictionary_fallback_ratio() -> f64 {
    0.5
}

fn default_data_page_row_count_limit() -> usize {
    20_000
}

fn default_row_group_size_bytes() -> usize {
    128 * 1024 * 1024
}

fn default_max_row_group_rows() -> usize {
    1024 * 1024
}

fn default_batch_size() -> usize {
    4096
}

fn default_created_by() -> String {
    format!("parquet-columnar version {}", crate::VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CodecConfig::from_json_str(
            r#"{"writer": {"compression": "zstd", "writer_version": "v2"}, "reader": {"batch_size": 128}}"#,
        )
        .unwrap();

        assert_eq!(config.writer.compression, Compression::Zstd);
        assert_eq!(config.writer.writer_version, WriterVersion::V2);
        assert!(config.writer.dictionary_enabled);
        assert_eq!(config.writer.page_size, 1024 * 1024);
        assert_eq!(config.reader.batch_size, 128);
        assert!(config.reader.tolerate_unannotated_decimal);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = CodecConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CodecConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = CodecConfig::from_json_str(r#"{"writer": {"page_size": 0}}"#);
        assert!(matches!(result, Err(ColumnarError::InvalidArgument(_))));

        let result = CodecConfig::from_json_str(r#"{"writer": {"compression": "lzma"}}"#);
        assert!(matches!(result, Err(ColumnarError::SerdeJson(_))));
    }
}
