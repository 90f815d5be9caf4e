// In: src/bridge/file_writer.rs

//! The stateful file writer.
//!
//! Batches are buffered until a row group is full (by row count or by the
//! approximate in-memory size of the buffered arrays). A full row group is
//! encoded column-by-column on the rayon pool; the resulting chunks are then
//! appended to the sink in schema order. The footer is written only by
//! [`ParquetWriter::close`], so a failed write never leaves a footer that
//! references bytes which were not written.

use std::io::Write;
use std::sync::Arc;

use arrow::array::Array;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;

use crate::bridge::arrow_impl;
use crate::chunk_pipeline::{ColumnChunkArtifact, TypedColumnWriter};
use crate::config::{WriterConfig, WriterVersion};
use crate::error::ColumnarError;
use crate::metadata::{write_footer, FileMetaData, KeyValue, RowGroup, PARQUET_MAGIC};
use crate::schema::{ColumnDescriptor, ParquetSchema};
use crate::types::{LogicalSchema, LOGICAL_SCHEMA_KEY};

//==================================================================================
// 1. Byte Counting Sink
//==================================================================================

/// Tracks the absolute position of a forward-only sink.
#[derive(Debug)]
struct CountingWriter<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

//==================================================================================
// 2. Parquet Writer
//==================================================================================

#[derive(Debug)]
pub struct ParquetWriter<W: Write> {
    sink: CountingWriter<W>,
    schema: SchemaRef,
    physical: ParquetSchema,
    config: Arc<WriterConfig>,
    /// The rendered logical schema, computed up front so a bad schema fails `new`.
    embedded_schema: Option<String>,

    buffered: Vec<RecordBatch>,
    buffered_rows: usize,
    buffered_bytes: usize,

    row_groups: Vec<RowGroup>,
    num_rows: i64,
    poisoned: bool,
}

impl<W: Write> ParquetWriter<W> {
    /// Validates the configuration, maps the schema to physical columns, and
    /// writes the leading magic.
    pub fn new(sink: W, schema: SchemaRef, config: WriterConfig) -> Result<Self, ColumnarError> {
        config.validate()?;
        let physical = ParquetSchema::from_arrow(&schema, &config)?;
        let embedded_schema = if config.embed_logical_schema {
            Some(LogicalSchema::from_arrow(&schema)?.to_json()?)
        } else {
            None
        };

        let mut sink = CountingWriter {
            inner: sink,
            bytes_written: 0,
        };
        sink.write_all(PARQUET_MAGIC)?;

        log::debug!(
            "Opened writer: {} columns, {:?}, {:?}",
            physical.num_columns(),
            config.writer_version,
            config.compression
        );
        Ok(Self {
            sink,
            schema,
            physical,
            config: Arc::new(config),
            embedded_schema,
            buffered: Vec::new(),
            buffered_rows: 0,
            buffered_bytes: 0,
            row_groups: Vec::new(),
            num_rows: 0,
            poisoned: false,
        })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Bytes handed to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.sink.bytes_written
    }

    /// Row groups already flushed to the sink.
    pub fn flushed_row_groups(&self) -> usize {
        self.row_groups.len()
    }

    fn check_usable(&self) -> Result<(), ColumnarError> {
        if self.poisoned {
            return Err(ColumnarError::InvalidArgument(
                "writer is unusable after a failed flush".to_string(),
            ));
        }
        Ok(())
    }

    /// Buffers a batch, flushing every row group it completes.
    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), ColumnarError> {
        self.check_usable()?;
        if batch.schema().fields() != self.schema.fields() {
            return Err(ColumnarError::InvalidArgument(format!(
                "batch schema {:?} does not match the writer schema {:?}",
                batch.schema(),
                self.schema
            )));
        }
        for (field, column) in self.schema.fields().iter().zip(batch.columns()) {
            if !field.is_nullable() && column.null_count() > 0 {
                return Err(ColumnarError::InvalidArgument(format!(
                    "non-nullable field '{}' holds {} nulls",
                    field.name(),
                    column.null_count()
                )));
            }
        }
        if batch.num_rows() == 0 {
            return Ok(());
        }

        self.buffered_rows += batch.num_rows();
        self.buffered_bytes += sliced_memory_size(batch)?;
        self.buffered.push(batch.clone());

        while self.buffered_rows >= self.config.max_row_group_rows {
            self.flush_rows(self.config.max_row_group_rows)?;
        }
        if self.buffered_bytes >= self.config.row_group_size_bytes {
            self.flush_rows(self.buffered_rows)?;
        }
        Ok(())
    }

    /// Flushes whatever is buffered as a (possibly short) row group.
    pub fn flush(&mut self) -> Result<(), ColumnarError> {
        self.check_usable()?;
        self.flush_rows(self.buffered_rows)
    }

    /// Writes the first `rows` buffered rows as one row group and keeps the rest buffered.
    fn flush_rows(&mut self, rows: usize) -> Result<(), ColumnarError> {
        if rows == 0 {
            return Ok(());
        }
        let combined = concat_batches(&self.schema, &self.buffered)?;
        let remaining = combined.num_rows() - rows;
        let group = combined.slice(0, rows);
        self.buffered.clear();
        self.buffered_rows = remaining;
        self.buffered_bytes = 0;
        if remaining > 0 {
            let rest = combined.slice(rows, remaining);
            self.buffered_bytes = sliced_memory_size(&rest)?;
            self.buffered.push(rest);
        }

        let result = self.write_row_group(&group);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn write_row_group(&mut self, batch: &RecordBatch) -> Result<(), ColumnarError> {
        let artifacts = self
            .physical
            .columns()
            .par_iter()
            .zip(batch.columns().par_iter())
            .map(|(desc, array)| encode_column(desc, array.as_ref(), &self.config))
            .collect::<Result<Vec<_>, ColumnarError>>()?;

        let codec = self.config.compression.codec();
        let file_offset = self.sink.bytes_written;
        let mut columns = Vec::with_capacity(artifacts.len());
        let mut total_byte_size = 0i64;
        let mut total_compressed_size = 0i64;
        for (desc, artifact) in self.physical.columns().iter().zip(&artifacts) {
            let chunk_offset = self.sink.bytes_written;
            self.sink.write_all(&artifact.bytes)?;
            let chunk = artifact.to_column_chunk(desc, codec, chunk_offset);
            total_byte_size += artifact.total_uncompressed_size as i64;
            total_compressed_size += artifact.total_compressed_size() as i64;
            columns.push(chunk);
        }

        let ordinal = i16::try_from(self.row_groups.len()).ok();
        log_metric!(
            "event" = "flush_row_group",
            "ordinal" = self.row_groups.len(),
            "rows" = batch.num_rows(),
            "bytes" = total_compressed_size
        );
        self.row_groups.push(RowGroup {
            columns,
            total_byte_size,
            num_rows: batch.num_rows() as i64,
            file_offset: Some(file_offset as i64),
            total_compressed_size: Some(total_compressed_size),
            ordinal,
        });
        self.num_rows += batch.num_rows() as i64;
        Ok(())
    }

    /// Flushes the last row group, writes the footer, and returns the sink.
    pub fn close(mut self) -> Result<W, ColumnarError> {
        self.flush()?;

        let mut key_value_metadata = Vec::with_capacity(self.config.extra_metadata.len() + 1);
        if let Some(json) = self.embedded_schema.take() {
            key_value_metadata.push(KeyValue {
                key: LOGICAL_SCHEMA_KEY.to_string(),
                value: Some(json),
            });
        }
        for (key, value) in &self.config.extra_metadata {
            key_value_metadata.push(KeyValue {
                key: key.clone(),
                value: Some(value.clone()),
            });
        }

        let metadata = FileMetaData {
            version: match self.config.writer_version {
                WriterVersion::V1 => 1,
                WriterVersion::V2 => 2,
            },
            schema: self.physical.to_elements(),
            num_rows: self.num_rows,
            row_groups: std::mem::take(&mut self.row_groups),
            key_value_metadata,
            created_by: Some(self.config.created_by.clone()),
        };
        let footer_len = write_footer(&mut self.sink, &metadata)?;
        self.sink.flush()?;

        log::info!(
            "Closed file: {} rows in {} row groups, {} bytes ({} footer)",
            metadata.num_rows,
            metadata.row_groups.len(),
            self.sink.bytes_written,
            footer_len
        );
        Ok(self.sink.inner)
    }
}

/// Bytes referenced by the rows of `batch`, excluding buffer regions outside a slice.
fn sliced_memory_size(batch: &RecordBatch) -> Result<usize, ColumnarError> {
    let mut total = 0;
    for column in batch.columns() {
        total += column.to_data().get_slice_memory_size()?;
    }
    Ok(total)
}

/// Encodes one column of a row group into a chunk.
fn encode_column(
    desc: &ColumnDescriptor,
    array: &dyn arrow::array::Array,
    config: &Arc<WriterConfig>,
) -> Result<ColumnChunkArtifact, ColumnarError> {
    let (values, validity) = arrow_impl::array_to_column(array, desc)?;
    let mut writer = TypedColumnWriter::new(desc.clone(), config.clone())?;
    writer.write(values, validity.as_deref())?;
    writer.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::read_footer;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::io::{self, Cursor};

    fn batch(schema: &SchemaRef, start: i32, rows: i32) -> RecordBatch {
        RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from((start..start + rows).collect::<Vec<_>>())),
                Arc::new(StringArray::from(
                    (start..start + rows).map(|i| format!("row-{}", i % 4)).collect::<Vec<_>>(),
                )),
            ],
        )
        .unwrap()
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("tag", DataType::Utf8, true),
        ]))
    }

    /// A sink that accepts a fixed number of bytes and then fails.
    struct FailingSink {
        remaining: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.remaining {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.remaining -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_row_groups_split_at_row_limit() {
        // Arrange
        let schema = schema();
        let config = WriterConfig {
            max_row_group_rows: 100,
            ..Default::default()
        };
        let mut writer = ParquetWriter::new(Vec::new(), schema.clone(), config).unwrap();

        // Act
        writer.write(&batch(&schema, 0, 150)).unwrap();
        writer.write(&batch(&schema, 150, 120)).unwrap();
        assert_eq!(writer.flushed_row_groups(), 2);
        let bytes = writer.close().unwrap();

        // Assert
        let metadata = read_footer(&mut Cursor::new(bytes)).unwrap();
        let rows: Vec<i64> = metadata.row_groups.iter().map(|rg| rg.num_rows).collect();
        assert_eq!(rows, vec![100, 100, 70]);
        assert_eq!(metadata.num_rows, 270);
        assert_eq!(metadata.row_groups[2].ordinal, Some(2));
        assert!(metadata.metadata_value(LOGICAL_SCHEMA_KEY).is_some());
    }

    #[test]
    fn test_byte_limit_counts_only_buffered_rows() {
        // Arrange: the whole batch exceeds the byte limit, its last 200 rows do not.
        let config = WriterConfig {
            max_row_group_rows: 400,
            row_group_size_bytes: 5000,
            ..Default::default()
        };
        let mut writer = ParquetWriter::new(Vec::new(), schema(), config).unwrap();

        // Act
        writer.write(&batch(&schema(), 0, 1000)).unwrap();

        // Assert
        assert_eq!(writer.flushed_row_groups(), 2);
        let bytes = writer.close().unwrap();
        let metadata = read_footer(&mut Cursor::new(bytes)).unwrap();
        let rows: Vec<i64> = metadata.row_groups.iter().map(|rg| rg.num_rows).collect();
        assert_eq!(rows, vec![400, 400, 200]);
    }

    #[test]
    fn test_footer_records_version_and_extra_metadata() {
        let schema = schema();
        let config = WriterConfig {
            writer_version: WriterVersion::V2,
            embed_logical_schema: false,
            extra_metadata: vec![("origin".to_string(), "unit-test".to_string())],
            ..Default::default()
        };
        let mut writer = ParquetWriter::new(Vec::new(), schema.clone(), config).unwrap();
        writer.write(&batch(&schema, 0, 10)).unwrap();

        let metadata = read_footer(&mut Cursor::new(writer.close().unwrap())).unwrap();

        assert_eq!(metadata.version, 2);
        assert_eq!(metadata.metadata_value("origin"), Some("unit-test"));
        assert_eq!(metadata.metadata_value(LOGICAL_SCHEMA_KEY), None);
        assert!(metadata.created_by.unwrap().starts_with("parquet-columnar"));
    }

    #[test]
    fn test_empty_file_has_schema_and_no_row_groups() {
        let writer = ParquetWriter::new(Vec::new(), schema(), WriterConfig::default()).unwrap();

        let metadata = read_footer(&mut Cursor::new(writer.close().unwrap())).unwrap();

        assert!(metadata.row_groups.is_empty());
        assert_eq!(metadata.schema.len(), 3);
    }

    #[test]
    fn test_mismatched_batch_is_rejected() {
        let schema = schema();
        let other = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, false)]));
        let mut writer = ParquetWriter::new(Vec::new(), schema, WriterConfig::default()).unwrap();
        let batch = RecordBatch::try_new(other, vec![Arc::new(Int32Array::from(vec![1]))]).unwrap();

        assert!(matches!(writer.write(&batch), Err(ColumnarError::InvalidArgument(_))));
    }

    #[test]
    fn test_io_error_poisons_writer() {
        // Arrange: room for the magic only.
        let schema = schema();
        let config = WriterConfig {
            max_row_group_rows: 10,
            ..Default::default()
        };
        let mut writer = ParquetWriter::new(FailingSink { remaining: 4 }, schema.clone(), config).unwrap();

        // Act
        let first = writer.write(&batch(&schema, 0, 10));
        let second = writer.write(&batch(&schema, 10, 1));

        // Assert
        assert!(matches!(first, Err(ColumnarError::Io(_))));
        assert!(matches!(second, Err(ColumnarError::InvalidArgument(_))));
        assert!(writer.close().is_err());
    }
}
