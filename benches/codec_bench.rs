// In parquet-columnar-core/benches/codec_bench.rs

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use parquet_columnar::kernels::{compression, rle};
use parquet_columnar::types::CompressionCodec;
use parquet_columnar::{read_batches, write_batches, ReadOptions, ReaderConfig, WriterConfig, WriterVersion};

// --- Data Generation ---

const BENCH_ROWS: usize = 100_000;

/// A low-cardinality string column, a unique id column and a noisy float column.
fn generate_batch(rows: usize) -> (RecordBatch, SchemaRef) {
    let mut rng = rand::rng();
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("city", DataType::Utf8, true),
        Field::new("reading", DataType::Float64, true),
    ]));
    let cities = ["oslo", "lima", "pune", "kyiv", "nome"];
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(0..rows as i64)),
            Arc::new(StringArray::from_iter((0..rows).map(|_| {
                let pick = rng.random_range(0..6usize);
                cities.get(pick).copied()
            }))),
            Arc::new(Float64Array::from_iter((0..rows).map(|i| {
                (i % 17 != 0).then(|| rng.random_range(-50.0..50.0))
            }))),
        ],
    )
    .unwrap();
    (batch, schema)
}

/// Definition-level shaped data: long runs with occasional short flips.
fn generate_levels(size: usize) -> Vec<u32> {
    let mut rng = rand::rng();
    let mut levels = Vec::with_capacity(size);
    while levels.len() < size {
        let run = rng.random_range(1..64usize);
        let value = rng.random_range(0..2u32);
        levels.extend(std::iter::repeat(value).take(run));
    }
    levels.truncate(size);
    levels
}

// --- Benchmark Suite ---

fn bench_file_round_trip(c: &mut Criterion) {
    let (batch, schema) = generate_batch(BENCH_ROWS);

    let mut group = c.benchmark_group("File Round Trip");
    group.throughput(Throughput::Elements(BENCH_ROWS as u64));

    for version in [WriterVersion::V1, WriterVersion::V2] {
        let config = WriterConfig {
            writer_version: version,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("write", format!("{:?}", version)), &config, |b, config| {
            b.iter(|| {
                write_batches(Vec::new(), schema.clone(), black_box(&[batch.clone()]), config.clone()).unwrap()
            })
        });

        let bytes = write_batches(Vec::new(), schema.clone(), &[batch.clone()], config).unwrap();
        group.bench_with_input(BenchmarkId::new("read", format!("{:?}", version)), &bytes, |b, bytes| {
            b.iter(|| {
                read_batches(Cursor::new(black_box(bytes.as_slice())), ReaderConfig::default(), ReadOptions::default())
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_kernels(c: &mut Criterion) {
    let levels = generate_levels(BENCH_ROWS);
    let mut encoded_levels = Vec::new();
    rle::encode(&levels, 1, &mut encoded_levels).unwrap();

    let mut group = c.benchmark_group("Kernels");
    group.throughput(Throughput::Elements(BENCH_ROWS as u64));

    group.bench_function("RLE Encode (levels)", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            rle::encode(black_box(&levels), 1, &mut out).unwrap();
            out
        })
    });
    group.bench_function("RLE Decode (levels)", |b| {
        b.iter(|| rle::decode(black_box(&encoded_levels), 1, BENCH_ROWS).unwrap())
    });

    let raw: Vec<u8> = (0..BENCH_ROWS as u64).flat_map(|i| (i / 8).to_le_bytes()).collect();
    for codec in [CompressionCodec::Snappy, CompressionCodec::Gzip, CompressionCodec::Zstd] {
        let mut compressed = Vec::new();
        compression::compress(codec, None, &raw, &mut compressed).unwrap();
        group.bench_with_input(BenchmarkId::new("compress", codec), &raw, |b, raw| {
            b.iter(|| {
                let mut out = Vec::new();
                compression::compress(codec, None, black_box(raw), &mut out).unwrap();
                out
            })
        });
        group.bench_with_input(BenchmarkId::new("decompress", codec), &compressed, |b, compressed| {
            b.iter(|| compression::decompress(codec, black_box(compressed), raw.len()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_file_round_trip, bench_kernels);
criterion_main!(benches);
