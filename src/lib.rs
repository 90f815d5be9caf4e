//! This file is the root of the `parquet_columnar` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`bridge`, `kernels`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of types most callers need: the writer, the
//!     reader and its options, the configs, and the error type.
//!
//! Writing and reading a file:
//!
//! ```no_run
//! use std::io::Cursor;
//! use parquet_columnar::{read_batches, write_batches, ReadOptions, ReaderConfig, WriterConfig};
//! # fn demo(schema: arrow::datatypes::SchemaRef, batch: arrow::record_batch::RecordBatch)
//! #     -> Result<(), parquet_columnar::ColumnarError> {
//! let bytes = write_batches(Vec::new(), schema, &[batch], WriterConfig::default())?;
//! let batches = read_batches(Cursor::new(bytes), ReaderConfig::default(), ReadOptions::default())?;
//! # Ok(())
//! # }
//! ```

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod bridge;
pub mod chunk_pipeline;
pub mod config;
pub mod error;
pub mod kernels;
pub mod metadata;
pub mod null_handling;
pub mod schema;
pub mod traits;
pub mod types;

mod utils;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use bridge::{
    inspect_file, read_batches, write_batches, BatchReader, ColumnarBatch, FileSummary, ParquetReader,
    ParquetWriter, ReadOptions,
};
pub use config::{CodecConfig, Compression, DecimalStorage, ReaderConfig, WriterConfig, WriterVersion};
pub use error::ColumnarError;
pub use observability::init_logging;
pub use schema::{PartitionValue, SchemaResolution};
