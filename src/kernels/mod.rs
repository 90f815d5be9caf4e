//! This module serves as the public API for the pure, stateless kernels of the
//! file format.
//!
//! Each kernel works on plain slices and byte buffers. None of them know about
//! pages, column chunks, or Arrow; the `chunk_pipeline` composes them.

pub mod bitpack;
pub mod compression;
pub mod dictionary;
pub mod leb128;
pub mod plain;
pub mod rle;
