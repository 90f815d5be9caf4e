//! The column chunk writer.
//!
//! Rows arrive as dense values plus optional per-row validity. They are buffered
//! into the current page, which is sealed when its estimated encoded size
//! reaches `page_size` or its row count reaches `data_page_row_count_limit`.
//!
//! ## Dictionary lifecycle
//!
//! ```text
//!            first page seal, distinct/values > ratio
//!   Active ------------------------------------------> Disabled  (all pages PLAIN)
//!     |
//!     | dictionary outgrows dictionary_page_size_limit
//!     v
//!   Frozen   (pages sealed so far stay dictionary-encoded, the rest is PLAIN)
//! ```
//!
//! BOOLEAN columns and writers with `dictionary_enabled = false` start in
//! `Disabled`. Sealed pages are never re-encoded.

use std::sync::Arc;

use crate::chunk_pipeline::artifact::ColumnChunkArtifact;
use crate::chunk_pipeline::page::{self, EncodedPage, PageOptions};
use crate::chunk_pipeline::statistics::StatisticsAccumulator;
use crate::config::{WriterConfig, WriterVersion};
use crate::error::ColumnarError;
use crate::kernels::dictionary::{self, DictEncoder};
use crate::schema::ColumnDescriptor;
use crate::traits::ParquetNative;
use crate::types::{ByteArray, ColumnValues, Encoding, FixedLenByteArray, PhysicalType};

#[derive(Debug)]
enum DictionaryState<T: ParquetNative> {
    Active(DictEncoder<T>),
    Frozen(DictEncoder<T>),
    Disabled,
}

//==================================================================================
// 1. Generic Column Chunk Writer
//==================================================================================

#[derive(Debug)]
pub struct ColumnChunkWriter<T: ParquetNative> {
    desc: ColumnDescriptor,
    config: Arc<WriterConfig>,
    options: PageOptions,
    dictionary: DictionaryState<T>,
    dictionary_pages: usize,

    // The page being filled.
    page_rows: usize,
    page_validity: Vec<bool>,
    page_indices: Vec<u32>,
    page_values: Vec<T>,
    page_value_bytes: usize,

    sealed: Vec<EncodedPage>,
    data_encodings: Vec<Encoding>,
    stats: StatisticsAccumulator<T>,
    num_rows: usize,
}

fn push_unique(encodings: &mut Vec<Encoding>, encoding: Encoding) {
    if !encodings.contains(&encoding) {
        encodings.push(encoding);
    }
}

impl<T: ParquetNative> ColumnChunkWriter<T> {
    pub fn new(desc: ColumnDescriptor, config: Arc<WriterConfig>) -> Self {
        let dictionary = if config.dictionary_enabled && T::PHYSICAL != PhysicalType::Boolean {
            DictionaryState::Active(DictEncoder::new(config.dictionary_page_size_limit))
        } else {
            DictionaryState::Disabled
        };
        let options = PageOptions {
            version: config.writer_version,
            codec: config.compression.codec(),
            level: config.compression_level,
        };
        let stats = StatisticsAccumulator::new(desc.sort_order(), config.statistics_enabled);
        Self {
            desc,
            config,
            options,
            dictionary,
            dictionary_pages: 0,
            page_rows: 0,
            page_validity: Vec::new(),
            page_indices: Vec::new(),
            page_values: Vec::new(),
            page_value_bytes: 0,
            sealed: Vec::new(),
            data_encodings: Vec::new(),
            stats,
            num_rows: 0,
        }
    }

    /// Appends rows. `values` holds only the non-null values; `validity` (one
    /// entry per row) is required whenever a row is null.
    pub fn write(&mut self, values: &[T], validity: Option<&[bool]>) -> Result<(), ColumnarError> {
        let num_rows = validity.map_or(values.len(), <[bool]>::len);
        if let Some(validity) = validity {
            let valid = validity.iter().filter(|&&v| v).count();
            if valid != values.len() {
                return Err(ColumnarError::InvalidArgument(format!(
                    "column '{}': validity marks {} rows valid but {} values were given",
                    self.desc.name,
                    valid,
                    values.len()
                )));
            }
            if !self.desc.is_optional() && valid != num_rows {
                return Err(ColumnarError::InvalidArgument(format!(
                    "required column '{}' received {} nulls",
                    self.desc.name,
                    num_rows - valid
                )));
            }
        }

        self.stats.update(values);
        self.stats.add_nulls(num_rows - values.len());

        let optional = self.desc.is_optional();
        let mut dense = values.iter();
        for row in 0..num_rows {
            let valid = validity.map_or(true, |v| v[row]);
            if valid {
                let value = dense.next().ok_or_else(|| {
                    ColumnarError::InternalError("ran out of dense values".to_string())
                })?;
                self.push_value(value)?;
            }
            if optional {
                self.page_validity.push(valid);
            }
            self.page_rows += 1;
            if self.page_is_full() {
                self.seal_page()?;
            }
        }
        self.num_rows += num_rows;
        Ok(())
    }

    /// Convenience over `write` for type-erased values.
    pub fn write_column_values(&mut self, values: ColumnValues, validity: Option<&[bool]>) -> Result<(), ColumnarError> {
        let values = T::from_column_values(values)?;
        self.write(&values, validity)
    }

    fn push_value(&mut self, value: &T) -> Result<(), ColumnarError> {
        if let DictionaryState::Active(dict) = &mut self.dictionary {
            match dict.put(value) {
                Ok(index) => {
                    self.page_indices.push(index);
                    return Ok(());
                }
                Err(ColumnarError::DictionaryOverflow) => {
                    self.seal_page()?;
                    self.freeze_dictionary();
                }
                Err(e) => return Err(e),
            }
        }
        self.page_value_bytes += value.plain_size();
        self.page_values.push(value.clone());
        Ok(())
    }

    fn freeze_dictionary(&mut self) {
        let state = std::mem::replace(&mut self.dictionary, DictionaryState::Disabled);
        self.dictionary = match state {
            DictionaryState::Active(dict) => {
                log_metric!(
                    "event" = "dictionary_frozen",
                    "column" = &self.desc.name,
                    "entries" = dict.len(),
                    "pages" = self.dictionary_pages
                );
                DictionaryState::Frozen(dict)
            }
            other => other,
        };
    }

    fn page_is_full(&self) -> bool {
        if self.page_rows >= self.config.data_page_row_count_limit {
            return true;
        }
        let estimate = match &self.dictionary {
            DictionaryState::Active(dict) => {
                (self.page_indices.len() * dict.bit_width().max(1) as usize).div_ceil(8)
            }
            _ => self.page_value_bytes,
        };
        estimate >= self.config.page_size
    }

    /// Drops the dictionary if the first page shows it does not pay off.
    fn check_first_page_ratio(&mut self) -> Result<(), ColumnarError> {
        if !self.sealed.is_empty() || self.page_indices.is_empty() {
            return Ok(());
        }
        let DictionaryState::Active(dict) = &self.dictionary else {
            return Ok(());
        };
        let ratio = dict.len() as f64 / self.page_indices.len() as f64;
        if ratio <= self.config.dictionary_fallback_ratio {
            return Ok(());
        }
        log_metric!(
            "event" = "dictionary_disabled",
            "column" = &self.desc.name,
            "distinct" = dict.len(),
            "values" = self.page_indices.len()
        );
        self.page_values = dictionary::materialize(dict.entries(), &self.page_indices)?;
        self.page_value_bytes = self.page_values.iter().map(ParquetNative::plain_size).sum();
        self.page_indices.clear();
        self.dictionary = DictionaryState::Disabled;
        Ok(())
    }

    fn seal_page(&mut self) -> Result<(), ColumnarError> {
        if self.page_rows == 0 {
            return Ok(());
        }
        self.check_first_page_ratio()?;

        let mut values = Vec::new();
        // A page of only nulls has no indices and is written PLAIN (and empty).
        let encoding = match &self.dictionary {
            DictionaryState::Active(dict) if !self.page_indices.is_empty() => {
                dictionary::encode_indices(&self.page_indices, dict.bit_width(), &mut values)?;
                self.dictionary_pages += 1;
                match self.options.version {
                    WriterVersion::V1 => Encoding::PlainDictionary,
                    WriterVersion::V2 => Encoding::RleDictionary,
                }
            }
            _ => {
                T::plain_encode(&self.page_values, self.desc.type_length(), &mut values)?;
                Encoding::Plain
            }
        };

        let validity = self.desc.is_optional().then_some(self.page_validity.as_slice());
        let page = page::build_data_page(self.options, encoding, self.page_rows, validity, &values)?;
        log::trace!(
            "Sealed {} page of {} rows for column '{}' ({} bytes)",
            encoding,
            self.page_rows,
            self.desc.name,
            page.body.len()
        );
        self.sealed.push(page);
        push_unique(&mut self.data_encodings, encoding);

        self.page_rows = 0;
        self.page_validity.clear();
        self.page_indices.clear();
        self.page_values.clear();
        self.page_value_bytes = 0;
        Ok(())
    }

    /// Seals the last page and lays out the chunk: dictionary page first, then data pages.
    pub fn close(mut self) -> Result<ColumnChunkArtifact, ColumnarError> {
        self.seal_page()?;

        let mut bytes = Vec::new();
        let mut total_uncompressed_size = 0;
        let mut encodings = Vec::new();

        let dictionary_page_offset = match &self.dictionary {
            DictionaryState::Active(dict) | DictionaryState::Frozen(dict) if self.dictionary_pages > 0 => {
                let mut plain = Vec::with_capacity(dict.plain_bytes());
                dict.write_dictionary_page(self.desc.type_length(), &mut plain)?;
                let page = page::build_dictionary_page(self.options, dict.len(), &plain)?;
                if let Some(header) = &page.header.dictionary_page_header {
                    push_unique(&mut encodings, header.encoding);
                }
                total_uncompressed_size += page.write_to(&mut bytes).1;
                Some(0)
            }
            _ => None,
        };

        let data_page_offset = bytes.len();
        for page in &self.sealed {
            total_uncompressed_size += page.write_to(&mut bytes).1;
        }
        if self.desc.is_optional() {
            push_unique(&mut encodings, Encoding::Rle);
        }
        for encoding in &self.data_encodings {
            push_unique(&mut encodings, *encoding);
        }

        log_metric!(
            "event" = "close_chunk",
            "column" = &self.desc.name,
            "rows" = self.num_rows,
            "pages" = self.sealed.len(),
            "bytes" = bytes.len()
        );

        Ok(ColumnChunkArtifact {
            bytes,
            dictionary_page_offset,
            data_page_offset,
            total_uncompressed_size,
            num_values: self.num_rows,
            encodings,
            statistics: self.stats.to_thrift(),
            num_data_pages: self.sealed.len(),
        })
    }
}

//==================================================================================
// 2. Type-Erased Dispatch
//==================================================================================

/// One column chunk writer per physical type.
#[derive(Debug)]
pub enum TypedColumnWriter {
    Boolean(ColumnChunkWriter<bool>),
    Int32(ColumnChunkWriter<i32>),
    Int64(ColumnChunkWriter<i64>),
    Float(ColumnChunkWriter<f32>),
    Double(ColumnChunkWriter<f64>),
    ByteArray(ColumnChunkWriter<ByteArray>),
    FixedLenByteArray(ColumnChunkWriter<FixedLenByteArray>),
}

macro_rules! dispatch_writer {
    ($self:expr, $writer:ident => $body:expr) => {
        match $self {
            TypedColumnWriter::Boolean($writer) => $body,
            TypedColumnWriter::Int32($writer) => $body,
            TypedColumnWriter::Int64($writer) => $body,
            TypedColumnWriter::Float($writer) => $body,
            TypedColumnWriter::Double($writer) => $body,
            TypedColumnWriter::ByteArray($writer) => $body,
            TypedColumnWriter::FixedLenByteArray($writer) => $body,
        }
    };
}

impl TypedColumnWriter {
    pub fn new(desc: ColumnDescriptor, config: Arc<WriterConfig>) -> Result<Self, ColumnarError> {
        Ok(match desc.physical_type {
            PhysicalType::Boolean => Self::Boolean(ColumnChunkWriter::new(desc, config)),
            PhysicalType::Int32 => Self::Int32(ColumnChunkWriter::new(desc, config)),
            PhysicalType::Int64 => Self::Int64(ColumnChunkWriter::new(desc, config)),
            PhysicalType::Float => Self::Float(ColumnChunkWriter::new(desc, config)),
            PhysicalType::Double => Self::Double(ColumnChunkWriter::new(desc, config)),
            PhysicalType::ByteArray => Self::ByteArray(ColumnChunkWriter::new(desc, config)),
            PhysicalType::FixedLenByteArray => Self::FixedLenByteArray(ColumnChunkWriter::new(desc, config)),
            PhysicalType::Int96 => {
                return Err(ColumnarError::UnsupportedType(format!(
                    "cannot write INT96 column '{}'",
                    desc.name
                )))
            }
        })
    }

    pub fn write(&mut self, values: ColumnValues, validity: Option<&[bool]>) -> Result<(), ColumnarError> {
        dispatch_writer!(self, w => w.write_column_values(values, validity))
    }

    pub fn close(self) -> Result<ColumnChunkArtifact, ColumnarError> {
        dispatch_writer!(self, w => w.close())
    }
}
