// In: src/bridge/file_reader.rs

//! The vectorized file reader.
//!
//! [`ParquetReader`] parses and validates the footer and resolves the file's
//! logical schema once. [`ParquetReader::read`] reconciles a requested schema
//! with it and returns a [`BatchReader`], which walks the selected row groups
//! and yields one batch of at most `batch_size` rows at a time. Batches never
//! span row groups.
//!
//! Column failures are isolated: a chunk that cannot be loaded or decoded
//! fails only its own column in [`ColumnarBatch::columns`]; sibling columns keep
//! decoding. The `Iterator`/`RecordBatchReader` view turns any failed column
//! into an error for that batch.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use arrow::array::{new_null_array, ArrayRef};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions, RecordBatchReader};
use rayon::prelude::*;

use crate::bridge::arrow_impl;
use crate::chunk_pipeline::{ColumnData, TypedColumnReader};
use crate::config::ReaderConfig;
use crate::error::ColumnarError;
use crate::metadata::{read_footer, ColumnMetaData, FileMetaData};
use crate::schema::{
    reconcile, resolve_file_schema, ColumnDescriptor, ColumnSource, ParquetSchema, PartitionValue,
    ResolvedSchema, SchemaResolution,
};

//==================================================================================
// 1. Read Options
//==================================================================================

/// What to read: the requested schema, partition constants, and row groups.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Output schema. `None` reads every file column with its resolved type,
    /// followed by any partition columns the file does not contain.
    pub requested_schema: Option<SchemaRef>,
    /// Constants broadcast into the same-named output columns.
    pub partition_values: HashMap<String, PartitionValue>,
    /// Row group indices to read, in order. `None` reads all of them.
    pub row_groups: Option<Vec<usize>>,
}

impl ReadOptions {
    pub fn with_requested_schema(mut self, schema: SchemaRef) -> Self {
        self.requested_schema = Some(schema);
        self
    }

    pub fn with_partition_value(mut self, name: impl Into<String>, value: PartitionValue) -> Self {
        self.partition_values.insert(name.into(), value);
        self
    }

    pub fn with_row_groups(mut self, row_groups: Vec<usize>) -> Self {
        self.row_groups = Some(row_groups);
        self
    }
}

//==================================================================================
// 2. File Reader
//==================================================================================

#[derive(Debug)]
pub struct ParquetReader<R: Read + Seek> {
    source: R,
    config: Arc<ReaderConfig>,
    metadata: FileMetaData,
    physical: ParquetSchema,
    schema: SchemaRef,
    resolution: SchemaResolution,
}

impl<R: Read + Seek> ParquetReader<R> {
    /// Reads the footer and resolves the file's logical schema.
    pub fn try_new(mut source: R, config: ReaderConfig) -> Result<Self, ColumnarError> {
        if config.batch_size == 0 {
            return Err(ColumnarError::InvalidArgument("batch_size must be positive".to_string()));
        }
        let metadata = read_footer(&mut source)?;
        let physical = ParquetSchema::from_elements(&metadata.schema)?;
        check_row_groups(&metadata, &physical)?;
        let (schema, resolution) = resolve_file_schema(&metadata, &physical, &config)?;

        log::info!(
            "Opened file: {} rows, {} row groups, {} columns, schema {:?}",
            metadata.num_rows,
            metadata.row_groups.len(),
            physical.num_columns(),
            resolution
        );
        Ok(Self {
            source,
            config: Arc::new(config),
            metadata,
            physical,
            schema: Arc::new(schema),
            resolution,
        })
    }

    /// The logical schema of the file (embedded or derived).
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn schema_resolution(&self) -> SchemaResolution {
        self.resolution
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn physical_schema(&self) -> &ParquetSchema {
        &self.physical
    }

    pub fn num_rows(&self) -> i64 {
        self.metadata.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.row_groups.len()
    }

    /// Reconciles the requested schema and starts reading.
    pub fn read(self, options: ReadOptions) -> Result<BatchReader<R>, ColumnarError> {
        let requested = match &options.requested_schema {
            Some(schema) => schema.clone(),
            None => default_requested_schema(&self.schema, &options.partition_values),
        };
        let resolved = reconcile(&self.physical, &requested, &options.partition_values, &self.config)?;

        let num_row_groups = self.metadata.row_groups.len();
        let row_groups: VecDeque<usize> = match options.row_groups {
            Some(indices) => {
                if let Some(bad) = indices.iter().find(|&&i| i >= num_row_groups) {
                    return Err(ColumnarError::InvalidArgument(format!(
                        "row group {} requested from a file with {} row groups",
                        bad, num_row_groups
                    )));
                }
                indices.into()
            }
            None => (0..num_row_groups).collect(),
        };

        log::debug!(
            "Reading {} of {} row groups; {} requested columns, {} decoded from the file",
            row_groups.len(),
            num_row_groups,
            resolved.fields.len(),
            resolved.file_columns().len()
        );
        Ok(BatchReader {
            schema: resolved.output_schema(),
            source: self.source,
            config: self.config,
            metadata: self.metadata,
            physical: self.physical,
            resolved,
            pending: row_groups,
            current: None,
        })
    }
}

/// Every row group must hold one chunk per column, of the column's physical type.
fn check_row_groups(metadata: &FileMetaData, physical: &ParquetSchema) -> Result<(), ColumnarError> {
    for (index, row_group) in metadata.row_groups.iter().enumerate() {
        if row_group.columns.len() != physical.num_columns() {
            return Err(ColumnarError::MalformedFooter(format!(
                "row group {} has {} chunks for {} columns",
                index,
                row_group.columns.len(),
                physical.num_columns()
            )));
        }
        for (chunk, desc) in row_group.columns.iter().zip(physical.columns()) {
            let stored = chunk.meta_data.as_ref().map(|m| m.physical_type);
            if stored != Some(desc.physical_type) {
                return Err(ColumnarError::MalformedFooter(format!(
                    "row group {} stores column '{}' as {:?}, schema says {}",
                    index, desc.name, stored, desc.physical_type
                )));
            }
        }
    }
    Ok(())
}

/// The file schema followed by partition columns absent from the file, by name.
fn default_requested_schema(file: &Schema, partitions: &HashMap<String, PartitionValue>) -> SchemaRef {
    let mut extra: Vec<(&String, &PartitionValue)> = partitions
        .iter()
        .filter(|(name, _)| file.field_with_name(name).is_err())
        .collect();
    extra.sort_by(|a, b| a.0.cmp(b.0));

    let mut fields: Vec<Field> = file.fields().iter().map(|f| f.as_ref().clone()).collect();
    for (name, value) in extra {
        let data_type = match value.data_type() {
            DataType::Null => DataType::Utf8,
            other => other,
        };
        fields.push(Field::new(name.clone(), data_type, true));
    }
    Arc::new(Schema::new(fields))
}

//==================================================================================
// 3. Column Cursors
//==================================================================================

enum CursorState {
    Open(TypedColumnReader),
    /// The chunk never loaded. The error is reported once, then `ColumnFailed`.
    Broken { error: Option<ColumnarError>, reason: String },
}

/// One decoded file column of the current row group.
struct ColumnCursor {
    desc: ColumnDescriptor,
    target: DataType,
    state: CursorState,
}

impl ColumnCursor {
    fn read(&mut self, rows: usize) -> Result<ColumnData, ColumnarError> {
        match &mut self.state {
            CursorState::Open(reader) => reader.read(rows),
            CursorState::Broken { error, reason } => Err(error.take().unwrap_or_else(|| {
                ColumnarError::ColumnFailed {
                    column: self.desc.name.clone(),
                    reason: reason.clone(),
                }
            })),
        }
    }

    fn next_array(&mut self, rows: usize) -> Result<ArrayRef, ColumnarError> {
        let data = self.read(rows)?;
        if data.num_rows != rows {
            return Err(ColumnarError::TruncatedPage {
                column: self.desc.name.clone(),
                detail: format!("chunk ended after {} of {} rows", data.num_rows, rows),
            });
        }
        arrow_impl::column_to_array(data, &self.desc, &self.target)
    }
}

fn read_chunk<R: Read + Seek>(source: &mut R, meta: &ColumnMetaData) -> Result<Vec<u8>, ColumnarError> {
    let start = u64::try_from(meta.chunk_start())
        .map_err(|_| ColumnarError::MalformedFooter(format!("negative chunk offset {}", meta.chunk_start())))?;
    let len = usize::try_from(meta.total_compressed_size)
        .map_err(|_| ColumnarError::MalformedFooter(format!("negative chunk size {}", meta.total_compressed_size)))?;
    let mut bytes = vec![0u8; len];
    source.seek(SeekFrom::Start(start))?;
    source.read_exact(&mut bytes)?;
    Ok(bytes)
}

//==================================================================================
// 4. Batch Reader
//==================================================================================

/// Decoded columns of one batch, each an independent result.
#[derive(Debug)]
pub struct ColumnarBatch {
    pub schema: SchemaRef,
    pub row_group: usize,
    pub num_rows: usize,
    pub columns: Vec<Result<ArrayRef, ColumnarError>>,
}

impl ColumnarBatch {
    /// Names of the columns that failed in this batch.
    pub fn failed_columns(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .zip(&self.columns)
            .filter(|(_, column)| column.is_err())
            .map(|(field, _)| field.name().as_str())
            .collect()
    }

    /// Assembles a `RecordBatch`, failing with the first column error.
    pub fn into_record_batch(self) -> Result<RecordBatch, ColumnarError> {
        let columns = self.columns.into_iter().collect::<Result<Vec<_>, _>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        Ok(RecordBatch::try_new_with_options(self.schema, columns, &options)?)
    }
}

struct RowGroupCursor {
    index: usize,
    rows_remaining: usize,
    columns: Vec<ColumnCursor>,
}

pub struct BatchReader<R: Read + Seek> {
    source: R,
    config: Arc<ReaderConfig>,
    metadata: FileMetaData,
    physical: ParquetSchema,
    resolved: ResolvedSchema,
    schema: SchemaRef,
    pending: VecDeque<usize>,
    current: Option<RowGroupCursor>,
}

impl<R: Read + Seek> BatchReader<R> {
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn resolved_schema(&self) -> &ResolvedSchema {
        &self.resolved
    }

    /// Loads the chunks of every decoded column of one row group.
    fn open_row_group(&mut self, index: usize) -> RowGroupCursor {
        let row_group = &self.metadata.row_groups[index];
        let mut columns = Vec::new();
        for resolved in &self.resolved.fields {
            let ColumnSource::File(column) = resolved.source else {
                continue;
            };
            let desc = &self.physical.columns()[column];
            let loaded = match row_group.columns[column].meta_data.as_ref() {
                Some(meta) => read_chunk(&mut self.source, meta)
                    .and_then(|bytes| TypedColumnReader::new(desc.clone(), meta.codec, bytes)),
                None => Err(ColumnarError::MalformedFooter(format!("chunk of '{}' has no metadata", desc.name))),
            };
            let state = match loaded {
                Ok(reader) => CursorState::Open(reader),
                Err(e) => {
                    let e = match e {
                        ColumnarError::Io(io) => ColumnarError::TruncatedPage {
                            column: desc.name.clone(),
                            detail: io.to_string(),
                        },
                        other => other,
                    };
                    log::warn!("Column '{}' in row group {} failed to load: {}", desc.name, index, e);
                    CursorState::Broken {
                        reason: e.to_string(),
                        error: Some(e),
                    }
                }
            };
            columns.push(ColumnCursor {
                desc: desc.clone(),
                target: resolved.field.data_type().clone(),
                state,
            });
        }
        log::debug!("Opened row group {} ({} rows)", index, row_group.num_rows);
        RowGroupCursor {
            index,
            rows_remaining: row_group.num_rows.max(0) as usize,
            columns,
        }
    }

    /// Decodes the next batch, keeping each column's outcome separate.
    pub fn next_columnar_batch(&mut self) -> Option<ColumnarBatch> {
        while self.current.as_ref().map_or(true, |c| c.rows_remaining == 0) {
            let index = self.pending.pop_front()?;
            self.current = Some(self.open_row_group(index));
        }
        let cursor = self.current.as_mut()?;
        let rows = cursor.rows_remaining.min(self.config.batch_size);

        let decode = |column: &mut ColumnCursor| column.next_array(rows);
        let decoded: Vec<Result<ArrayRef, ColumnarError>> = if self.config.parallel_decode {
            cursor.columns.par_iter_mut().map(decode).collect()
        } else {
            cursor.columns.iter_mut().map(decode).collect()
        };
        cursor.rows_remaining -= rows;
        let row_group = cursor.index;

        let mut decoded = decoded.into_iter();
        let columns = self
            .resolved
            .fields
            .iter()
            .map(|resolved| match &resolved.source {
                ColumnSource::File(_) => decoded.next().unwrap_or_else(|| {
                    Err(ColumnarError::InternalError("decoded column count mismatch".to_string()))
                }),
                ColumnSource::Partition(value) => value.to_array(resolved.field.data_type(), rows),
                ColumnSource::Missing => Ok(new_null_array(resolved.field.data_type(), rows)),
            })
            .collect();

        Some(ColumnarBatch {
            schema: self.schema.clone(),
            row_group,
            num_rows: rows,
            columns,
        })
    }
}

impl<R: Read + Seek> Iterator for BatchReader<R> {
    type Item = Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_columnar_batch()
            .map(|batch| batch.into_record_batch().map_err(ArrowError::from))
    }
}

impl<R: Read + Seek> RecordBatchReader for BatchReader<R> {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}
