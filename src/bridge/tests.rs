// In: src/bridge/tests.rs

//! End-to-end tests: Arrow batches -> file bytes -> Arrow batches.

use super::*;
use crate::config::{Compression, DecimalStorage, ReaderConfig, WriterConfig, WriterVersion};
use crate::error::ColumnarError;
use crate::metadata::{read_footer, read_page_header};
use crate::schema::{PartitionValue, SchemaResolution};
use crate::types::{PhysicalType, LOGICAL_SCHEMA_KEY};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Decimal128Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Int32Type, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use std::io::Cursor;
use std::sync::Arc;

//==================================================================================
// Helpers
//==================================================================================

/// 1000 rows of `(i % 2 == 0, i, i, i, i)`.
fn create_scenario_batch() -> (RecordBatch, SchemaRef) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("flag", DataType::Boolean, false),
        Field::new("int", DataType::Int32, false),
        Field::new("long", DataType::Int64, false),
        Field::new("float", DataType::Float32, false),
        Field::new("double", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(BooleanArray::from((0..1000).map(|i| i % 2 == 0).collect::<Vec<_>>())),
            Arc::new(Int32Array::from((0..1000).collect::<Vec<i32>>())),
            Arc::new(Int64Array::from((0..1000).collect::<Vec<i64>>())),
            Arc::new(Float32Array::from((0..1000).map(|i| i as f32).collect::<Vec<_>>())),
            Arc::new(Float64Array::from((0..1000).map(|i| i as f64).collect::<Vec<_>>())),
        ],
    )
    .unwrap();
    (batch, schema)
}

fn write_file(schema: &SchemaRef, batches: &[RecordBatch], config: WriterConfig) -> Vec<u8> {
    write_batches(Vec::new(), schema.clone(), batches, config).unwrap()
}

fn read_file(bytes: &[u8], config: ReaderConfig, options: ReadOptions) -> Vec<RecordBatch> {
    read_batches(Cursor::new(bytes.to_vec()), config, options).unwrap()
}

fn open(bytes: &[u8]) -> ParquetReader<Cursor<Vec<u8>>> {
    ParquetReader::try_new(Cursor::new(bytes.to_vec()), ReaderConfig::default()).unwrap()
}

fn int_column(name: &str, nullable: bool, rows: i32) -> (RecordBatch, SchemaRef) {
    let schema = Arc::new(Schema::new(vec![Field::new(name, DataType::Int32, nullable)]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from_iter_values(0..rows))]).unwrap();
    (batch, schema)
}

//==================================================================================
// Round Trips
//==================================================================================

#[test]
fn test_scenario_roundtrip_every_version_and_codec() {
    let (original, schema) = create_scenario_batch();

    for writer_version in [WriterVersion::V1, WriterVersion::V2] {
        for compression in [
            Compression::Uncompressed,
            Compression::Snappy,
            Compression::Gzip,
            Compression::Zstd,
        ] {
            // Arrange
            let config = WriterConfig {
                writer_version,
                compression,
                ..Default::default()
            };
            let bytes = write_file(&schema, &[original.clone()], config);

            // Act
            let batches = read_file(&bytes, ReaderConfig::default(), ReadOptions::default());

            // Assert
            assert_eq!(batches, vec![original.clone()], "{:?}/{:?}", writer_version, compression);
        }
    }
}

#[test]
fn test_nullable_mixed_types_across_pages_and_batches() {
    // Arrange
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("ts", DataType::Timestamp(TimeUnit::Microsecond, None), true),
        Field::new("day", DataType::Date32, true),
        Field::new("ok", DataType::Boolean, true),
    ]));
    let rows = 300;
    let original = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                (0..rows).map(|i| (i % 3 != 0).then(|| format!("name-{}", i % 11))).collect::<Vec<_>>(),
            )),
            Arc::new(TimestampMicrosecondArray::from(
                (0..rows).map(|i| (i % 5 != 0).then_some(1_700_000_000_000_000 + i as i64)).collect::<Vec<_>>(),
            )),
            Arc::new(Date32Array::from((0..rows).map(|i| (i % 7 != 0).then_some(19_000 + i)).collect::<Vec<_>>())),
            Arc::new(BooleanArray::from((0..rows).map(|i| (i % 4 != 0).then_some(i % 3 == 0)).collect::<Vec<_>>())),
        ],
    )
    .unwrap();
    let config = WriterConfig {
        data_page_row_count_limit: 64,
        ..Default::default()
    };
    let bytes = write_file(&schema, &[original.clone()], config);

    // Act
    let reader_config = ReaderConfig {
        batch_size: 100,
        ..Default::default()
    };
    let batches = read_file(&bytes, reader_config, ReadOptions::default());

    // Assert
    assert_eq!(batches.len(), 3);
    assert_eq!(concat_batches(&schema, &batches).unwrap(), original);
}

#[test]
fn test_decimal_stored_as_int64_roundtrip() {
    // Arrange
    let schema = Arc::new(Schema::new(vec![Field::new("amount", DataType::Decimal128(9, 1), true)]));
    let values = Decimal128Array::from(vec![Some(12345), None, Some(-10), Some(999_999_999)])
        .with_precision_and_scale(9, 1)
        .unwrap();
    let original = RecordBatch::try_new(schema.clone(), vec![Arc::new(values)]).unwrap();
    let config = WriterConfig {
        decimal_storage: DecimalStorage::Int64,
        ..Default::default()
    };
    let bytes = write_file(&schema, &[original.clone()], config);

    // Act
    let reader = open(&bytes);
    let physical = reader.physical_schema().column(0).unwrap().physical_type;
    let batches = read_file(&bytes, ReaderConfig::default(), ReadOptions::default());

    // Assert
    assert_eq!(physical, PhysicalType::Int64);
    assert_eq!(batches, vec![original]);
}

#[test]
fn test_unannotated_int64_read_as_decimal() {
    // Arrange: a legacy file with bare INT64 and no embedded schema.
    let schema = Arc::new(Schema::new(vec![Field::new("amount", DataType::Int64, true)]));
    let original = RecordBatch::try_new(schema.clone(), vec![Arc::new(Int64Array::from(vec![Some(15), None, Some(-7)]))])
        .unwrap();
    let config = WriterConfig {
        embed_logical_schema: false,
        ..Default::default()
    };
    let bytes = write_file(&schema, &[original], config);
    let requested = Arc::new(Schema::new(vec![Field::new("amount", DataType::Decimal128(9, 1), true)]));

    // Act
    let batches = read_file(
        &bytes,
        ReaderConfig::default(),
        ReadOptions::default().with_requested_schema(requested.clone()),
    );
    let strict = ParquetReader::try_new(
        Cursor::new(bytes.clone()),
        ReaderConfig {
            tolerate_unannotated_decimal: false,
            ..Default::default()
        },
    )
    .unwrap()
    .read(ReadOptions::default().with_requested_schema(requested));

    // Assert
    let decimals = batches[0].column(0).as_primitive::<arrow::datatypes::Decimal128Type>();
    assert_eq!(decimals.data_type(), &DataType::Decimal128(9, 1));
    assert_eq!(decimals.iter().collect::<Vec<_>>(), vec![Some(15), None, Some(-7)]);
    assert!(matches!(strict, Err(ColumnarError::SchemaIncompatible { .. })));
}

#[test]
fn test_on_disk_roundtrip() {
    let (original, schema) = create_scenario_batch();
    let file = tempfile::tempfile().unwrap();

    let file = write_batches(file, schema, &[original.clone()], WriterConfig::default()).unwrap();
    let batches = read_batches(file, ReaderConfig::default(), ReadOptions::default()).unwrap();

    assert_eq!(batches, vec![original]);
}

//==================================================================================
// Schema Resolution and Reconciliation
//==================================================================================

#[test]
fn test_embedded_schema_paths() {
    let (batch, schema) = int_column("id", false, 10);

    let embedded = write_file(&schema, &[batch.clone()], WriterConfig::default());
    assert_eq!(open(&embedded).schema_resolution(), SchemaResolution::Embedded);

    let legacy = write_file(
        &schema,
        &[batch.clone()],
        WriterConfig {
            embed_logical_schema: false,
            extra_metadata: vec![(
                LOGICAL_SCHEMA_KEY.to_string(),
                "StructType(List(StructField(id,IntegerType,false)))".to_string(),
            )],
            ..Default::default()
        },
    );
    assert_eq!(open(&legacy).schema_resolution(), SchemaResolution::EmbeddedLegacy);

    let garbage = write_file(
        &schema,
        &[batch.clone()],
        WriterConfig {
            embed_logical_schema: false,
            extra_metadata: vec![(LOGICAL_SCHEMA_KEY.to_string(), "{not json".to_string())],
            ..Default::default()
        },
    );
    let reader = open(&garbage);
    assert_eq!(reader.schema_resolution(), SchemaResolution::Derived);
    assert_eq!(reader.schema().field(0).data_type(), &DataType::Int32);
    assert_eq!(read_file(&garbage, ReaderConfig::default(), ReadOptions::default()), vec![batch]);
}

#[test]
fn test_partition_values_are_broadcast() {
    // Arrange
    let (batch, schema) = int_column("id", false, 10);
    let bytes = write_file(&schema, &[batch], WriterConfig::default());
    let options = ReadOptions::default().with_partition_value("date", PartitionValue::Utf8("2024-01-01".into()));

    // Act
    let batches = read_file(&bytes, ReaderConfig::default(), options);

    // Assert
    let output = &batches[0];
    assert_eq!(output.schema().field(1).name(), "date");
    assert!(output.schema().field(1).is_nullable());
    let dates = output.column(1).as_string::<i32>();
    assert!(dates.iter().all(|d| d == Some("2024-01-01")));
    assert_eq!(dates.len(), 10);
}

#[test]
fn test_partition_shadows_file_column() {
    let (batch, schema) = int_column("id", false, 10);
    let bytes = write_file(&schema, &[batch], WriterConfig::default());
    let options = ReadOptions::default()
        .with_requested_schema(schema.clone())
        .with_partition_value("id", PartitionValue::Int32(7));

    let batches = read_file(&bytes, ReaderConfig::default(), options);

    assert!(batches[0].column(0).as_primitive::<Int32Type>().iter().all(|v| v == Some(7)));
}

#[test]
fn test_missing_column_is_null_filled_and_nullable() {
    let (batch, schema) = int_column("id", false, 10);
    let bytes = write_file(&schema, &[batch], WriterConfig::default());
    let requested = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("score", DataType::Float64, false),
    ]));

    let batches = read_file(&bytes, ReaderConfig::default(), ReadOptions::default().with_requested_schema(requested));

    let output = &batches[0];
    assert!(output.schema().field(1).is_nullable());
    assert_eq!(output.column(1).null_count(), 10);
    assert_eq!(output.column(1).data_type(), &DataType::Float64);
}

#[test]
fn test_incompatible_request_fails_before_reading() {
    let (batch, schema) = int_column("id", false, 10);
    let bytes = write_file(&schema, &[batch], WriterConfig::default());
    let requested = Arc::new(Schema::new(vec![Field::new("id", DataType::Utf8, true)]));

    let result = open(&bytes).read(ReadOptions::default().with_requested_schema(requested));

    match result {
        Err(ColumnarError::SchemaIncompatible { column, physical, requested }) => {
            assert_eq!(column, "id");
            assert_eq!(physical, "INT32");
            assert_eq!(requested, "Utf8");
        }
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("request should have been rejected"),
    }
}

//==================================================================================
// Projection and Row Groups
//==================================================================================

#[test]
fn test_zero_column_request_counts_rows() {
    let (original, schema) = create_scenario_batch();
    let bytes = write_file(&schema, &[original], WriterConfig::default());
    let config = ReaderConfig {
        batch_size: 300,
        ..Default::default()
    };

    let batches = read_file(
        &bytes,
        config,
        ReadOptions::default().with_requested_schema(Arc::new(Schema::empty())),
    );

    let rows: Vec<usize> = batches.iter().map(RecordBatch::num_rows).collect();
    assert_eq!(rows, vec![300, 300, 300, 100]);
    assert!(batches.iter().all(|b| b.num_columns() == 0));
}

#[test]
fn test_batches_never_span_row_groups() {
    // Arrange: four row groups of 250 rows.
    let (original, schema) = create_scenario_batch();
    let config = WriterConfig {
        max_row_group_rows: 250,
        ..Default::default()
    };
    let bytes = write_file(&schema, &[original.clone()], config);
    assert_eq!(open(&bytes).num_row_groups(), 4);

    // Act
    let reader_config = ReaderConfig {
        batch_size: 300,
        ..Default::default()
    };
    let batches = read_file(&bytes, reader_config, ReadOptions::default());

    // Assert
    let rows: Vec<usize> = batches.iter().map(RecordBatch::num_rows).collect();
    assert_eq!(rows, vec![250, 250, 250, 250]);
    assert_eq!(concat_batches(&schema, &batches).unwrap(), original);
}

#[test]
fn test_row_group_selection() {
    let (original, schema) = create_scenario_batch();
    let config = WriterConfig {
        max_row_group_rows: 250,
        ..Default::default()
    };
    let bytes = write_file(&schema, &[original.clone()], config);

    let batches = read_file(&bytes, ReaderConfig::default(), ReadOptions::default().with_row_groups(vec![2]));
    let out_of_range = open(&bytes).read(ReadOptions::default().with_row_groups(vec![4]));

    assert_eq!(batches, vec![original.slice(500, 250)]);
    assert!(matches!(out_of_range, Err(ColumnarError::InvalidArgument(_))));
}

#[test]
fn test_serial_decode_matches_parallel() {
    let (original, schema) = create_scenario_batch();
    let bytes = write_file(&schema, &[original.clone()], WriterConfig::default());
    let config = ReaderConfig {
        parallel_decode: false,
        ..Default::default()
    };

    assert_eq!(read_file(&bytes, config, ReadOptions::default()), vec![original]);
}

//==================================================================================
// Failure Isolation
//==================================================================================

#[test]
fn test_corrupt_page_fails_only_its_column() {
    // Arrange
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Int64, false),
        Field::new("b", DataType::Int64, true),
    ]));
    let original = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from((0..1000).collect::<Vec<i64>>())),
            Arc::new(Int64Array::from((0..1000).map(|i| (i % 9 != 0).then_some(i)).collect::<Vec<_>>())),
        ],
    )
    .unwrap();
    let config = WriterConfig {
        compression: Compression::Uncompressed,
        dictionary_enabled: false,
        ..Default::default()
    };
    let mut bytes = write_file(&schema, &[original.clone()], config);

    // Point column b's definition-level length past the end of its page.
    let metadata = read_footer(&mut Cursor::new(&bytes)).unwrap();
    let start = metadata.row_groups[0].columns[1].meta_data.as_ref().unwrap().chunk_start() as usize;
    let (_, header_len) = read_page_header(&bytes[start..]).unwrap();
    bytes[start + header_len..start + header_len + 4].copy_from_slice(&[0xFF; 4]);

    let reader_config = ReaderConfig {
        batch_size: 400,
        ..Default::default()
    };
    let mut reader = ParquetReader::try_new(Cursor::new(bytes), reader_config)
        .unwrap()
        .read(ReadOptions::default())
        .unwrap();

    // Act
    let first = reader.next_columnar_batch().unwrap();
    let second = reader.next_columnar_batch().unwrap();

    // Assert
    assert_eq!(first.failed_columns(), vec!["b"]);
    assert_eq!(first.columns[0].as_ref().unwrap(), &original.column(0).slice(0, 400));
    assert!(matches!(first.columns[1], Err(ColumnarError::TruncatedPage { .. })));
    assert!(matches!(second.columns[1], Err(ColumnarError::ColumnFailed { .. })));
    assert!(second.columns[0].is_ok());
    assert!(second.into_record_batch().is_err());
    assert!(matches!(reader.next(), Some(Err(_))));
    assert!(reader.next().is_none());
}

#[test]
fn test_malformed_footer_is_rejected() {
    let (batch, schema) = int_column("id", false, 10);
    let mut bytes = write_file(&schema, &[batch], WriterConfig::default());
    let len = bytes.len();
    bytes[len - 1] = b'X';

    let result = ParquetReader::try_new(Cursor::new(bytes), ReaderConfig::default());

    assert!(matches!(result, Err(ColumnarError::MalformedFooter(_))));
}

#[test]
fn test_footer_statistics() {
    let (batch, schema) = int_column("id", false, 1000);
    let bytes = write_file(&schema, &[batch], WriterConfig::default());

    let metadata = open(&bytes).metadata().clone();

    let stats = metadata.row_groups[0].columns[0]
        .meta_data
        .as_ref()
        .and_then(|m| m.statistics.clone())
        .unwrap();
    assert_eq!(stats.min_value, Some(0i32.to_le_bytes().to_vec()));
    assert_eq!(stats.max_value, Some(999i32.to_le_bytes().to_vec()));
    assert_eq!(stats.null_count, Some(0));
}
