//! Writing and validating the file trailer.
//!
//! ```text
//! PAR1 | column chunks ... | FileMetaData (Thrift compact) | footer length (u32 LE) | PAR1
//! ```
//!
//! The footer is written last, after every column chunk it references.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::ColumnarError;
use crate::metadata::structs::{self, FileMetaData, PageHeader};

pub const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

/// Magic at both ends plus the length word.
const MIN_FILE_LEN: u64 = 12;

/// Appends the footer, its length, and the trailing magic. Returns the bytes written.
pub fn write_footer<W: Write>(sink: &mut W, metadata: &FileMetaData) -> Result<u64, ColumnarError> {
    let bytes = structs::to_bytes(metadata);
    let footer_len = u32::try_from(bytes.len())
        .map_err(|_| ColumnarError::InvalidArgument("footer exceeds 4 GiB".to_string()))?;
    sink.write_all(&bytes)?;
    sink.write_all(&footer_len.to_le_bytes())?;
    sink.write_all(PARQUET_MAGIC)?;
    Ok(bytes.len() as u64 + 8)
}

/// Validates the trailer and both magics, then parses the footer.
pub fn read_footer<R: Read + Seek>(source: &mut R) -> Result<FileMetaData, ColumnarError> {
    let file_len = source.seek(SeekFrom::End(0))?;
    if file_len < MIN_FILE_LEN {
        return Err(ColumnarError::MalformedFooter(format!(
            "file of {} bytes is too small to hold a footer",
            file_len
        )));
    }

    let mut head = [0u8; 4];
    source.seek(SeekFrom::Start(0))?;
    source.read_exact(&mut head)?;
    if &head != PARQUET_MAGIC {
        return Err(ColumnarError::MalformedFooter("missing leading PAR1 magic".to_string()));
    }

    let mut trailer = [0u8; 8];
    source.seek(SeekFrom::Start(file_len - 8))?;
    source.read_exact(&mut trailer)?;
    if &trailer[4..] != PARQUET_MAGIC {
        return Err(ColumnarError::MalformedFooter("missing trailing PAR1 magic".to_string()));
    }

    let footer_len = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as u64;
    if footer_len == 0 || footer_len > file_len - MIN_FILE_LEN {
        return Err(ColumnarError::MalformedFooter(format!(
            "footer length {} does not fit in a file of {} bytes",
            footer_len, file_len
        )));
    }

    let mut footer = vec![0u8; footer_len as usize];
    source.seek(SeekFrom::Start(file_len - 8 - footer_len))?;
    source.read_exact(&mut footer)?;

    let (metadata, _) = structs::from_bytes::<FileMetaData>(&footer)
        .map_err(|e| ColumnarError::MalformedFooter(e.to_string()))?;
    validate(&metadata, file_len)?;
    log::debug!(
        "Read footer: {} row groups, {} rows, {} schema elements",
        metadata.row_groups.len(),
        metadata.num_rows,
        metadata.schema.len()
    );
    Ok(metadata)
}

/// Cross-checks that every chunk lies inside the data region of the file.
fn validate(metadata: &FileMetaData, file_len: u64) -> Result<(), ColumnarError> {
    let data_end = file_len as i64;
    for (rg_index, row_group) in metadata.row_groups.iter().enumerate() {
        for column in &row_group.columns {
            let meta = column.meta_data.as_ref().ok_or_else(|| {
                ColumnarError::MalformedFooter(format!("row group {} has a chunk without metadata", rg_index))
            })?;
            let start = meta.chunk_start();
            if start < 4 || meta.total_compressed_size < 0 || start + meta.total_compressed_size > data_end {
                return Err(ColumnarError::MalformedFooter(format!(
                    "column '{}' in row group {} spans {}..{} outside the file",
                    meta.path_in_schema.join("."),
                    rg_index,
                    start,
                    start + meta.total_compressed_size
                )));
            }
        }
    }
    Ok(())
}

/// Parses a page header from the front of `bytes`, returning it with its length.
pub fn read_page_header(bytes: &[u8]) -> Result<(PageHeader, usize), ColumnarError> {
    structs::from_bytes::<PageHeader>(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::structs::{KeyValue, SchemaElement};
    use std::io::Cursor;

    fn empty_metadata() -> FileMetaData {
        FileMetaData {
            version: 1,
            schema: vec![SchemaElement {
                name: "root".to_string(),
                num_children: Some(0),
                ..Default::default()
            }],
            num_rows: 0,
            row_groups: Vec::new(),
            key_value_metadata: vec![KeyValue {
                key: "a".to_string(),
                value: Some("b".to_string()),
            }],
            created_by: None,
        }
    }

    fn file_with_footer(meta: &FileMetaData) -> Vec<u8> {
        let mut file = PARQUET_MAGIC.to_vec();
        write_footer(&mut file, meta).unwrap();
        file
    }

    #[test]
    fn test_footer_roundtrip() {
        let meta = empty_metadata();
        let file = file_with_footer(&meta);
        let decoded = read_footer(&mut Cursor::new(file)).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_bad_trailing_magic() {
        let mut file = file_with_footer(&empty_metadata());
        let len = file.len();
        file[len - 1] = b'X';
        let result = read_footer(&mut Cursor::new(file));
        assert!(matches!(result, Err(ColumnarError::MalformedFooter(_))));
    }

    #[test]
    fn test_bad_leading_magic() {
        let mut file = file_with_footer(&empty_metadata());
        file[0] = b'X';
        let result = read_footer(&mut Cursor::new(file));
        assert!(matches!(result, Err(ColumnarError::MalformedFooter(_))));
    }

    #[test]
    fn test_footer_length_out_of_range() {
        let mut file = file_with_footer(&empty_metadata());
        let len = file.len();
        file[len - 8..len - 4].copy_from_slice(&10_000u32.to_le_bytes());
        let result = read_footer(&mut Cursor::new(file));
        assert!(matches!(result, Err(ColumnarError::MalformedFooter(_))));
    }

    #[test]
    fn test_tiny_file() {
        let result = read_footer(&mut Cursor::new(b"PAR1PAR1".to_vec()));
        assert!(matches!(result, Err(ColumnarError::MalformedFooter(_))));
    }

    #[test]
    fn test_garbage_footer_is_malformed() {
        let mut file = PARQUET_MAGIC.to_vec();
        file.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        file.extend_from_slice(&3u32.to_le_bytes());
        file.extend_from_slice(PARQUET_MAGIC);
        let result = read_footer(&mut Cursor::new(file));
        assert!(matches!(result, Err(ColumnarError::MalformedFooter(_))));
    }
}
