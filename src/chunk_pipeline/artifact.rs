//! The in-memory result of encoding one column chunk.
//!
//! An artifact holds the chunk's serialized pages with offsets relative to its
//! own start. The file writer appends the bytes and rebases the offsets onto
//! the absolute file position to build the footer's `ColumnChunk`.

use crate::metadata::{ColumnChunk, ColumnMetaData, Statistics};
use crate::schema::ColumnDescriptor;
use crate::types::{CompressionCodec, Encoding};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunkArtifact {
    /// Dictionary page (if any) followed by every data page.
    pub bytes: Vec<u8>,
    /// Offset of the dictionary page within `bytes`. Always 0 when present.
    pub dictionary_page_offset: Option<usize>,
    /// Offset of the first data page within `bytes`.
    pub data_page_offset: usize,
    /// Sum of header sizes plus uncompressed body sizes.
    pub total_uncompressed_size: usize,
    /// Rows in the chunk, nulls included.
    pub num_values: usize,
    /// Distinct encodings in first-use order.
    pub encodings: Vec<Encoding>,
    pub statistics: Statistics,
    pub num_data_pages: usize,
}

impl ColumnChunkArtifact {
    pub fn total_compressed_size(&self) -> usize {
        self.bytes.len()
    }

    /// Builds the footer entry for this chunk once it sits at `file_offset`.
    pub fn to_column_chunk(&self, desc: &ColumnDescriptor, codec: CompressionCodec, file_offset: u64) -> ColumnChunk {
        let base = file_offset as i64;
        let meta = ColumnMetaData {
            physical_type: desc.physical_type,
            encodings: self.encodings.clone(),
            path_in_schema: vec![desc.name.clone()],
            codec,
            num_values: self.num_values as i64,
            total_uncompressed_size: self.total_uncompressed_size as i64,
            total_compressed_size: self.total_compressed_size() as i64,
            key_value_metadata: Vec::new(),
            data_page_offset: base + self.data_page_offset as i64,
            index_page_offset: None,
            dictionary_page_offset: self.dictionary_page_offset.map(|offset| base + offset as i64),
            statistics: Some(self.statistics.clone()),
        };
        ColumnChunk {
            file_path: None,
            file_offset: base + self.total_compressed_size() as i64,
            meta_data: Some(meta),
        }
    }
}
