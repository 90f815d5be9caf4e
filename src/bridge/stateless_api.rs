// In: src/bridge/stateless_api.rs

//! One-call wrappers over the stateful writer and reader.

use std::io::{Read, Seek, Write};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::bridge::file_reader::{ParquetReader, ReadOptions};
use crate::bridge::file_writer::ParquetWriter;
use crate::bridge::format::FileSummary;
use crate::config::{ReaderConfig, WriterConfig};
use crate::error::ColumnarError;

/// Writes `batches` as a complete file and returns the sink.
pub fn write_batches<W: Write>(
    sink: W,
    schema: SchemaRef,
    batches: &[RecordBatch],
    config: WriterConfig,
) -> Result<W, ColumnarError> {
    let mut writer = ParquetWriter::new(sink, schema, config)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()
}

/// Reads a whole file into memory. Any failed column fails the call.
pub fn read_batches<R: Read + Seek>(
    source: R,
    config: ReaderConfig,
    options: ReadOptions,
) -> Result<Vec<RecordBatch>, ColumnarError> {
    let mut reader = ParquetReader::try_new(source, config)?.read(options)?;
    let mut batches = Vec::new();
    while let Some(batch) = reader.next_columnar_batch() {
        batches.push(batch.into_record_batch()?);
    }
    Ok(batches)
}

/// Summarizes the footer without decoding any page.
pub fn inspect_file<R: Read + Seek>(source: R) -> Result<FileSummary, ColumnarError> {
    let reader = ParquetReader::try_new(source, ReaderConfig::default())?;
    FileSummary::new(
        reader.metadata(),
        reader.physical_schema(),
        reader.schema().as_ref().clone(),
        reader.schema_resolution(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaResolution;
    use crate::types::{CompressionCodec, Encoding};
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn test_inspect_reports_encodings_and_statistics() {
        // 1. Arrange: a low-cardinality string column and a unique integer column.
        let schema = Arc::new(Schema::new(vec![
            Field::new("city", DataType::Utf8, true),
            Field::new("id", DataType::Int64, false),
        ]));
        let cities: Vec<Option<&str>> = (0..500).map(|i| if i % 5 == 0 { None } else { Some(["a", "b"][i % 2]) }).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(cities)),
                Arc::new(Int64Array::from((0..500).collect::<Vec<i64>>())),
            ],
        )
        .unwrap();
        let bytes = write_batches(Vec::new(), schema, &[batch], WriterConfig::default()).unwrap();

        // 2. Act
        let summary = inspect_file(Cursor::new(bytes)).unwrap();

        // 3. Assert
        assert_eq!(summary.schema_resolution, SchemaResolution::Embedded);
        assert_eq!(summary.num_rows, 500);
        let chunks = &summary.row_groups[0].columns;
        assert_eq!(chunks[0].codec, CompressionCodec::Snappy);
        assert_eq!(
            chunks[0].encodings,
            vec![Encoding::PlainDictionary, Encoding::Rle]
        );
        assert_eq!(chunks[0].null_count, Some(100));
        assert_eq!(chunks[0].min_value.as_deref(), Some("61"));
        assert_eq!(chunks[1].encodings, vec![Encoding::Plain]);
        assert!(summary.to_json_pretty().unwrap().contains("\"schema_resolution\": \"embedded\""));
    }
}
