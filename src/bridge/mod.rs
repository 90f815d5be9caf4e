// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing API of the library. It owns everything that
// touches Arrow `RecordBatch`es or a byte stream, and encapsulates the Arrow-agnostic
// `chunk_pipeline` engine.
//
// Data Flow (Write):
//
//   1. [ParquetWriter]                  -> Receives `RecordBatch`es, buffers a row group
//         |
//         `-> for each column (rayon) ->
//
//   2. [arrow_impl::array_to_column]     -> `&dyn Array` -> (`ColumnValues`, validity)
//         |
//         `-> [chunk_pipeline::TypedColumnWriter] -> `ColumnChunkArtifact`
//
//   3. [ParquetWriter]                  -> Appends chunks in schema order; `close()`
//                                          writes the Thrift footer and `PAR1`.
//
// Data Flow (Read):
//
//   1. [ParquetReader]                  -> Footer, physical schema, resolved logical schema
//         |
//         `-> `read(ReadOptions)` reconciles the requested schema ->
//
//   2. [BatchReader]                    -> Per row group: loads chunk bytes, then per
//         |                                batch decodes each file column (rayon)
//         `-> [chunk_pipeline::TypedColumnReader] -> `ColumnData`
//
//   3. [arrow_impl::column_to_array]     -> `ColumnData` -> `ArrayRef` of the requested type;
//                                          partition columns broadcast, missing columns null.
//
// ====================================================================================
pub(crate) mod arrow_impl;
pub mod file_reader;
pub mod file_writer;
pub mod format;
pub mod stateless_api;

// --- High-Level Stateful API ---
pub use file_reader::{BatchReader, ColumnarBatch, ParquetReader, ReadOptions};
pub use file_writer::ParquetWriter;

// --- Convenience API ---
pub use stateless_api::{inspect_file, read_batches, write_batches};

// --- Summaries ---
pub use format::{ColumnChunkSummary, ColumnSummary, FileSummary, RowGroupSummary};

#[cfg(test)]
mod tests;
