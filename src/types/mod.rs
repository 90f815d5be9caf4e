//! This module defines the canonical, type-safe vocabulary shared by the writer
//! and the reader: the physical (on-disk) types and annotations, the logical
//! schema model embedded in the footer, and the physically-typed value buffers
//! exchanged between the Arrow bridge and the column pipeline.

pub mod logical;
pub mod physical;
pub mod values;

pub use logical::{LogicalField, LogicalSchema, LOGICAL_SCHEMA_KEY};
pub use physical::{
    ColumnAnnotation, CompressionCodec, ConvertedType, Encoding, LogicalTypeAnnotation, PageType,
    PhysicalType, Repetition, SortOrder, TimeUnit,
};
pub use values::{ByteArray, ColumnValues, FixedLenByteArray};
