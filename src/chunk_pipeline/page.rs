//! Building and opening individual pages.
//!
//! ```text
//! DATA_PAGE (v1):     header | compress( [def-level length u32 LE | def levels] values )
//! DATA_PAGE_V2:       header | def levels (never compressed) | compress(values)
//! DICTIONARY_PAGE:    header | compress( PLAIN(dictionary entries) )
//! ```
//!
//! Levels are present only for optional columns. Page bodies are the unit of
//! compression; headers are always plain Thrift.

use crate::config::WriterVersion;
use crate::error::ColumnarError;
use crate::kernels::compression;
use crate::metadata::{structs, DataPageHeader, DataPageHeaderV2, DictionaryPageHeader, PageHeader};
use crate::null_handling::levels;
use crate::types::{CompressionCodec, Encoding, PageType};

//==================================================================================
// 1. Page Building
//==================================================================================

/// A sealed page: its header and its (possibly compressed) body.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    pub header: PageHeader,
    pub body: Vec<u8>,
}

impl EncodedPage {
    /// Appends header and body to `out`, returning `(written, uncompressed)` byte counts
    /// where both include the header.
    pub fn write_to(&self, out: &mut Vec<u8>) -> (usize, usize) {
        let header = structs::to_bytes(&self.header);
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.body);
        (
            header.len() + self.body.len(),
            header.len() + self.header.uncompressed_page_size as usize,
        )
    }
}

/// Codec and layout shared by every page of a column chunk.
#[derive(Debug, Clone, Copy)]
pub struct PageOptions {
    pub version: WriterVersion,
    pub codec: CompressionCodec,
    pub level: Option<i32>,
}

fn page_size(len: usize) -> Result<i32, ColumnarError> {
    i32::try_from(len).map_err(|_| ColumnarError::InvalidArgument(format!("page of {} bytes exceeds 2 GiB", len)))
}

/// Seals a data page from encoded values and, for optional columns, per-row validity.
pub fn build_data_page(
    options: PageOptions,
    encoding: Encoding,
    num_rows: usize,
    validity: Option<&[bool]>,
    values: &[u8],
) -> Result<EncodedPage, ColumnarError> {
    let num_nulls = validity.map_or(0, |v| v.iter().filter(|&&valid| !valid).count());
    match options.version {
        WriterVersion::V1 => {
            let mut raw = Vec::with_capacity(values.len() + 16);
            if let Some(validity) = validity {
                levels::encode(validity, true, &mut raw)?;
            }
            raw.extend_from_slice(values);
            let mut body = Vec::new();
            compression::compress(options.codec, options.level, &raw, &mut body)?;
            Ok(EncodedPage {
                header: PageHeader {
                    page_type: PageType::DataPage,
                    uncompressed_page_size: page_size(raw.len())?,
                    compressed_page_size: page_size(body.len())?,
                    crc: None,
                    data_page_header: Some(DataPageHeader {
                        num_values: page_size(num_rows)?,
                        encoding,
                        definition_level_encoding: Encoding::Rle,
                        repetition_level_encoding: Encoding::Rle,
                        statistics: None,
                    }),
                    dictionary_page_header: None,
                    data_page_header_v2: None,
                },
                body,
            })
        }
        WriterVersion::V2 => {
            let mut body = Vec::new();
            if let Some(validity) = validity {
                levels::encode(validity, false, &mut body)?;
            }
            let levels_len = body.len();
            compression::compress(options.codec, options.level, values, &mut body)?;
            Ok(EncodedPage {
                header: PageHeader {
                    page_type: PageType::DataPageV2,
                    uncompressed_page_size: page_size(levels_len + values.len())?,
                    compressed_page_size: page_size(body.len())?,
                    crc: None,
                    data_page_header: None,
                    dictionary_page_header: None,
                    data_page_header_v2: Some(DataPageHeaderV2 {
                        num_values: page_size(num_rows)?,
                        num_nulls: page_size(num_nulls)?,
                        num_rows: page_size(num_rows)?,
                        encoding,
                        definition_levels_byte_length: page_size(levels_len)?,
                        repetition_levels_byte_length: 0,
                        is_compressed: Some(options.codec != CompressionCodec::Uncompressed),
                        statistics: None,
                    }),
                },
                body,
            })
        }
    }
}

/// Seals the dictionary page from its PLAIN-encoded entries.
pub fn build_dictionary_page(
    options: PageOptions,
    num_entries: usize,
    plain: &[u8],
) -> Result<EncodedPage, ColumnarError> {
    let encoding = match options.version {
        WriterVersion::V1 => Encoding::PlainDictionary,
        WriterVersion::V2 => Encoding::Plain,
    };
    let mut body = Vec::new();
    compression::compress(options.codec, options.level, plain, &mut body)?;
    Ok(EncodedPage {
        header: PageHeader {
            page_type: PageType::DictionaryPage,
            uncompressed_page_size: page_size(plain.len())?,
            compressed_page_size: page_size(body.len())?,
            crc: None,
            data_page_header: None,
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: page_size(num_entries)?,
                encoding,
                is_sorted: None,
            }),
            data_page_header_v2: None,
        },
        body,
    })
}

//==================================================================================
// 2. Page Opening
//==================================================================================

/// A page after decompression and level decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPage {
    Dictionary {
        num_entries: usize,
        plain: Vec<u8>,
    },
    Data {
        num_rows: usize,
        /// Per-row validity, `None` for required columns.
        validity: Option<Vec<bool>>,
        /// Number of non-null values in `values`.
        num_values: usize,
        encoding: Encoding,
        values: Vec<u8>,
    },
    /// Index pages carry nothing the reader needs.
    Skipped,
}

fn declared_len(value: i32, what: &str) -> Result<usize, ColumnarError> {
    usize::try_from(value).map_err(|_| ColumnarError::Thrift(format!("negative {} {}", what, value)))
}

fn count_valid(num_rows: usize, validity: &Option<Vec<bool>>) -> usize {
    validity
        .as_ref()
        .map_or(num_rows, |v| v.iter().filter(|&&valid| valid).count())
}

/// Decompresses `body` and splits off definition levels.
pub fn decode_page(
    header: &PageHeader,
    body: &[u8],
    codec: CompressionCodec,
    optional: bool,
) -> Result<DecodedPage, ColumnarError> {
    let uncompressed_size = declared_len(header.uncompressed_page_size, "uncompressed_page_size")?;
    match header.page_type {
        PageType::DictionaryPage => {
            let dict = header
                .dictionary_page_header
                .as_ref()
                .ok_or_else(|| ColumnarError::Thrift("dictionary page without its header".to_string()))?;
            Ok(DecodedPage::Dictionary {
                num_entries: declared_len(dict.num_values, "dictionary size")?,
                plain: compression::decompress(codec, body, uncompressed_size)?,
            })
        }
        PageType::DataPage => {
            let data = header
                .data_page_header
                .as_ref()
                .ok_or_else(|| ColumnarError::Thrift("data page without its header".to_string()))?;
            let num_rows = declared_len(data.num_values, "num_values")?;
            let raw = compression::decompress(codec, body, uncompressed_size)?;
            let (validity, consumed) = if optional {
                let (validity, consumed) = levels::decode_prefixed(&raw, num_rows)?;
                (Some(validity), consumed)
            } else {
                (None, 0)
            };
            Ok(DecodedPage::Data {
                num_rows,
                num_values: count_valid(num_rows, &validity),
                validity,
                encoding: data.encoding,
                values: raw[consumed..].to_vec(),
            })
        }
        PageType::DataPageV2 => {
            let data = header
                .data_page_header_v2
                .as_ref()
                .ok_or_else(|| ColumnarError::Thrift("v2 data page without its header".to_string()))?;
            if data.repetition_levels_byte_length != 0 {
                return Err(ColumnarError::UnsupportedType("repetition levels in a flat column".to_string()));
            }
            let num_rows = declared_len(data.num_rows, "num_rows")?;
            let levels_len = declared_len(data.definition_levels_byte_length, "definition level length")?;
            if levels_len > body.len() {
                return Err(ColumnarError::RleDecodeError(format!(
                    "definition levels declare {} bytes in a {}-byte page",
                    levels_len,
                    body.len()
                )));
            }
            let (level_bytes, value_bytes) = body.split_at(levels_len);
            let values_size = uncompressed_size.checked_sub(levels_len).ok_or_else(|| {
                ColumnarError::Thrift("definition levels exceed the uncompressed page size".to_string())
            })?;
            let values = if data.is_compressed.unwrap_or(true) {
                compression::decompress(codec, value_bytes, values_size)?
            } else {
                value_bytes.to_vec()
            };
            let validity = if optional {
                Some(levels::decode(level_bytes, num_rows)?)
            } else {
                None
            };
            Ok(DecodedPage::Data {
                num_rows,
                num_values: count_valid(num_rows, &validity),
                validity,
                encoding: data.encoding,
                values,
            })
        }
        PageType::IndexPage => Ok(DecodedPage::Skipped),
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::read_page_header;

    fn options(version: WriterVersion, codec: CompressionCodec) -> PageOptions {
        PageOptions {
            version,
            codec,
            level: None,
        }
    }

    fn reopen(page: &EncodedPage, codec: CompressionCodec, optional: bool) -> DecodedPage {
        let mut bytes = Vec::new();
        page.write_to(&mut bytes);
        let (header, header_len) = read_page_header(&bytes).unwrap();
        decode_page(&header, &bytes[header_len..], codec, optional).unwrap()
    }

    #[test]
    fn test_v1_page_with_levels_roundtrip() {
        // Arrange
        let validity = [true, false, true, true];
        let values: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let opts = options(WriterVersion::V1, CompressionCodec::Snappy);

        // Act
        let page = build_data_page(opts, Encoding::Plain, 4, Some(&validity), &values).unwrap();
        let decoded = reopen(&page, CompressionCodec::Snappy, true);

        // Assert
        assert_eq!(page.header.page_type, PageType::DataPage);
        match decoded {
            DecodedPage::Data {
                num_rows,
                validity: Some(v),
                num_values,
                encoding,
                values: decoded_values,
            } => {
                assert_eq!(num_rows, 4);
                assert_eq!(v, validity.to_vec());
                assert_eq!(num_values, 3);
                assert_eq!(encoding, Encoding::Plain);
                assert_eq!(decoded_values, values);
            }
            other => panic!("unexpected page {:?}", other),
        }
    }

    #[test]
    fn test_v2_levels_stay_uncompressed() {
        let validity = vec![false; 64];
        let opts = options(WriterVersion::V2, CompressionCodec::Zstd);
        let page = build_data_page(opts, Encoding::RleDictionary, 64, Some(&validity), &[]).unwrap();

        let v2 = page.header.data_page_header_v2.as_ref().unwrap();
        assert_eq!(v2.num_nulls, 64);
        assert_eq!(v2.is_compressed, Some(true));
        let levels_len = v2.definition_levels_byte_length as usize;
        // The level stream is readable straight out of the body.
        assert_eq!(levels::decode(&page.body[..levels_len], 64).unwrap(), validity);

        match reopen(&page, CompressionCodec::Zstd, true) {
            DecodedPage::Data { num_values, .. } => assert_eq!(num_values, 0),
            other => panic!("unexpected page {:?}", other),
        }
    }

    #[test]
    fn test_dictionary_page_tags_follow_version() {
        let v1 = build_dictionary_page(options(WriterVersion::V1, CompressionCodec::Gzip), 2, &[0; 8]).unwrap();
        let v2 = build_dictionary_page(options(WriterVersion::V2, CompressionCodec::Gzip), 2, &[0; 8]).unwrap();
        assert_eq!(
            v1.header.dictionary_page_header.as_ref().unwrap().encoding,
            Encoding::PlainDictionary
        );
        assert_eq!(v2.header.dictionary_page_header.as_ref().unwrap().encoding, Encoding::Plain);
        assert_eq!(
            reopen(&v1, CompressionCodec::Gzip, false),
            DecodedPage::Dictionary {
                num_entries: 2,
                plain: vec![0; 8]
            }
        );
    }

    #[test]
    fn test_required_column_has_no_levels() {
        let values = 7i64.to_le_bytes();
        let page = build_data_page(
            options(WriterVersion::V1, CompressionCodec::Uncompressed),
            Encoding::Plain,
            1,
            None,
            &values,
        )
        .unwrap();
        assert_eq!(page.body, values.to_vec());
        match reopen(&page, CompressionCodec::Uncompressed, false) {
            DecodedPage::Data { validity, num_values, .. } => {
                assert!(validity.is_none());
                assert_eq!(num_values, 1);
            }
            other => panic!("unexpected page {:?}", other),
        }
    }

    #[test]
    fn test_truncated_body_is_an_error() {
        let values: Vec<u8> = (0..100u8).collect();
        let page = build_data_page(
            options(WriterVersion::V1, CompressionCodec::Snappy),
            Encoding::Plain,
            25,
            None,
            &values,
        )
        .unwrap();
        let truncated = &page.body[..page.body.len() / 2];
        let result = decode_page(&page.header, truncated, CompressionCodec::Snappy, false);
        assert!(result.is_err_and(|e| e.is_page_corruption()));
    }
}
