//! The page and column chunk engine.
//!
//! This layer is Arrow-agnostic: it moves physically-typed values
//! ([`ColumnValues`](crate::types::ColumnValues)) and per-row validity in and
//! out of serialized column chunks. The `bridge` converts Arrow arrays at the
//! edges and the file writer/reader place chunks in a file.
//!
//! - `writer`: buffers rows into pages, manages the dictionary lifecycle, and
//!   produces a [`ColumnChunkArtifact`];
//! - `reader`: the per-column page state machine;
//! - `page`: data page v1/v2 and dictionary page layout;
//! - `statistics`: incremental min/max/null counts.

pub mod artifact;
pub mod page;
pub mod reader;
pub mod statistics;
pub mod writer;

pub use artifact::ColumnChunkArtifact;
pub use reader::{ColumnChunkReader, ColumnData, ReaderState, TypedColumnReader};
pub use writer::{ColumnChunkWriter, TypedColumnWriter};
