//! The footer and metadata manager.
//!
//! `thrift` implements the compact protocol, `structs` the file and page
//! metadata types on top of it, and `footer` the trailer layout with its
//! validation.

pub mod footer;
pub mod structs;
pub mod thrift;

pub use footer::{read_footer, read_page_header, write_footer, PARQUET_MAGIC};
pub use structs::{
    ColumnChunk, ColumnMetaData, DataPageHeader, DataPageHeaderV2, DictionaryPageHeader, FileMetaData,
    KeyValue, PageHeader, RowGroup, SchemaElement, Statistics, ThriftStruct,
};
