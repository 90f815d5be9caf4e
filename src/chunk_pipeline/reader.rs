//! The column chunk reader.
//!
//! A reader owns the raw bytes of one column chunk and walks its pages lazily:
//!
//! ```text
//! NotInitialized --first data page--> PageLoaded --rows taken--> Decoding
//!        |                                ^                         |
//!        |                                `----next data page-------'
//!        `--------------- no pages left ------------------------> Exhausted
//!
//! any page error --> Failed (terminal; later reads return ColumnFailed)
//! ```
//!
//! The dictionary page, when present, is decoded in full before the first data
//! page's indices are resolved.

use crate::chunk_pipeline::page::{self, DecodedPage};
use crate::error::ColumnarError;
use crate::kernels::dictionary;
use crate::metadata::read_page_header;
use crate::schema::ColumnDescriptor;
use crate::traits::ParquetNative;
use crate::types::{ByteArray, ColumnValues, CompressionCodec, Encoding, FixedLenByteArray, PhysicalType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderState {
    NotInitialized,
    PageLoaded,
    Decoding,
    Exhausted,
    Failed(String),
}

/// Decoded rows of one column: dense values plus per-row validity for optional columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnData {
    pub values: ColumnValues,
    pub validity: Option<Vec<bool>>,
    pub num_rows: usize,
}

//==================================================================================
// 1. Generic Column Chunk Reader
//==================================================================================

#[derive(Debug)]
pub struct ColumnChunkReader<T: ParquetNative> {
    desc: ColumnDescriptor,
    codec: CompressionCodec,
    chunk: Vec<u8>,
    offset: usize,
    dictionary: Option<Vec<T>>,
    state: ReaderState,

    // The current data page.
    values: Vec<T>,
    validity: Option<Vec<bool>>,
    page_rows: usize,
    row_pos: usize,
}

impl<T: ParquetNative> ColumnChunkReader<T> {
    pub fn new(desc: ColumnDescriptor, codec: CompressionCodec, chunk: Vec<u8>) -> Self {
        Self {
            desc,
            codec,
            chunk,
            offset: 0,
            dictionary: None,
            state: ReaderState::NotInitialized,
            values: Vec::new(),
            validity: None,
            page_rows: 0,
            row_pos: 0,
        }
    }

    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.desc
    }

    /// Reads up to `max_rows` rows. Fewer rows are returned only at the end of the chunk.
    pub fn read(&mut self, max_rows: usize) -> Result<ColumnData, ColumnarError> {
        if let ReaderState::Failed(reason) = &self.state {
            return Err(ColumnarError::ColumnFailed {
                column: self.desc.name.clone(),
                reason: reason.clone(),
            });
        }
        match self.read_rows(max_rows) {
            Ok(data) => Ok(data),
            Err(e) => {
                let e = if e.is_page_corruption() {
                    ColumnarError::TruncatedPage {
                        column: self.desc.name.clone(),
                        detail: e.to_string(),
                    }
                } else {
                    e
                };
                log::warn!("Column '{}' failed: {}", self.desc.name, e);
                self.state = ReaderState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn read_rows(&mut self, max_rows: usize) -> Result<ColumnData, ColumnarError> {
        let mut values: Vec<T> = Vec::new();
        let mut validity = self.desc.is_optional().then(Vec::new);
        let mut rows = 0;

        while rows < max_rows {
            if self.row_pos == self.page_rows && !self.load_next_data_page()? {
                self.state = ReaderState::Exhausted;
                break;
            }
            let take = (max_rows - rows).min(self.page_rows - self.row_pos);
            let page_validity = self
                .validity
                .as_ref()
                .map(|v| &v[self.row_pos..self.row_pos + take]);
            let num_values = page_validity.map_or(take, |v| v.iter().filter(|&&valid| valid).count());
            if num_values > self.values.len() {
                return Err(ColumnarError::PlainDecodeError(format!(
                    "page holds {} values, levels require {}",
                    self.values.len(),
                    num_values
                )));
            }
            if let Some(out) = validity.as_mut() {
                match page_validity {
                    Some(v) => out.extend_from_slice(v),
                    None => out.extend(std::iter::repeat(true).take(take)),
                }
            }
            values.extend(self.values.drain(..num_values));
            self.row_pos += take;
            rows += take;
            self.state = ReaderState::Decoding;
        }

        Ok(ColumnData {
            values: T::into_column_values(values),
            validity,
            num_rows: rows,
        })
    }

    /// Advances to the next data page, decoding a dictionary page on the way.
    /// Returns false once the chunk has no pages left.
    fn load_next_data_page(&mut self) -> Result<bool, ColumnarError> {
        while self.offset < self.chunk.len() {
            let (header, header_len) = read_page_header(&self.chunk[self.offset..])?;
            let body_start = self.offset + header_len;
            let body_len = usize::try_from(header.compressed_page_size)
                .map_err(|_| ColumnarError::Thrift("negative compressed_page_size".to_string()))?;
            let body = self.chunk.get(body_start..body_start + body_len).ok_or_else(|| {
                ColumnarError::TruncatedPage {
                    column: self.desc.name.clone(),
                    detail: format!(
                        "page body of {} bytes at offset {} runs past the {}-byte chunk",
                        body_len,
                        body_start,
                        self.chunk.len()
                    ),
                }
            })?;
            let decoded = page::decode_page(&header, body, self.codec, self.desc.is_optional())?;
            self.offset = body_start + body_len;

            match decoded {
                DecodedPage::Dictionary { num_entries, plain } => {
                    if self.dictionary.is_some() {
                        return Err(ColumnarError::DictionaryError(
                            "chunk holds more than one dictionary page".to_string(),
                        ));
                    }
                    let (entries, _) = T::plain_decode(&plain, num_entries, self.desc.type_length())?;
                    self.dictionary = Some(entries);
                }
                DecodedPage::Data {
                    num_rows,
                    validity,
                    num_values,
                    encoding,
                    values,
                } => {
                    self.values = self.decode_values(encoding, &values, num_values)?;
                    self.validity = validity;
                    self.page_rows = num_rows;
                    self.row_pos = 0;
                    self.state = ReaderState::PageLoaded;
                    if num_rows > 0 {
                        return Ok(true);
                    }
                }
                DecodedPage::Skipped => {}
            }
        }
        Ok(false)
    }

    fn decode_values(&self, encoding: Encoding, bytes: &[u8], num_values: usize) -> Result<Vec<T>, ColumnarError> {
        if encoding.is_dictionary() {
            let dict = self.dictionary.as_ref().ok_or_else(|| {
                ColumnarError::DictionaryError("dictionary-encoded page without a dictionary page".to_string())
            })?;
            let indices = dictionary::decode_indices(bytes, num_values)?;
            return dictionary::materialize(dict, &indices);
        }
        match encoding {
            Encoding::Plain => Ok(T::plain_decode(bytes, num_values, self.desc.type_length())?.0),
            other => Err(ColumnarError::UnsupportedType(format!(
                "{} encoding in column '{}'",
                other, self.desc.name
            ))),
        }
    }
}

//==================================================================================
// 2. Type-Erased Dispatch
//==================================================================================

#[derive(Debug)]
pub enum TypedColumnReader {
    Boolean(ColumnChunkReader<bool>),
    Int32(ColumnChunkReader<i32>),
    Int64(ColumnChunkReader<i64>),
    Float(ColumnChunkReader<f32>),
    Double(ColumnChunkReader<f64>),
    ByteArray(ColumnChunkReader<ByteArray>),
    FixedLenByteArray(ColumnChunkReader<FixedLenByteArray>),
}

macro_rules! dispatch_reader {
    ($self:expr, $reader:ident => $body:expr) => {
        match $self {
            TypedColumnReader::Boolean($reader) => $body,
            TypedColumnReader::Int32($reader) => $body,
            TypedColumnReader::Int64($reader) => $body,
            TypedColumnReader::Float($reader) => $body,
            TypedColumnReader::Double($reader) => $body,
            TypedColumnReader::ByteArray($reader) => $body,
            TypedColumnReader::FixedLenByteArray($reader) => $body,
        }
    };
}

impl TypedColumnReader {
    pub fn new(desc: ColumnDescriptor, codec: CompressionCodec, chunk: Vec<u8>) -> Result<Self, ColumnarError> {
        Ok(match desc.physical_type {
            PhysicalType::Boolean => Self::Boolean(ColumnChunkReader::new(desc, codec, chunk)),
            PhysicalType::Int32 => Self::Int32(ColumnChunkReader::new(desc, codec, chunk)),
            PhysicalType::Int64 => Self::Int64(ColumnChunkReader::new(desc, codec, chunk)),
            PhysicalType::Float => Self::Float(ColumnChunkReader::new(desc, codec, chunk)),
            PhysicalType::Double => Self::Double(ColumnChunkReader::new(desc, codec, chunk)),
            PhysicalType::ByteArray => Self::ByteArray(ColumnChunkReader::new(desc, codec, chunk)),
            PhysicalType::FixedLenByteArray => Self::FixedLenByteArray(ColumnChunkReader::new(desc, codec, chunk)),
            PhysicalType::Int96 => {
                return Err(ColumnarError::UnsupportedType(format!(
                    "INT96 column '{}'",
                    desc.name
                )))
            }
        })
    }

    pub fn read(&mut self, max_rows: usize) -> Result<ColumnData, ColumnarError> {
        dispatch_reader!(self, r => r.read(max_rows))
    }

    pub fn state(&self) -> &ReaderState {
        dispatch_reader!(self, r => r.state())
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        dispatch_reader!(self, r => r.descriptor())
    }
}
