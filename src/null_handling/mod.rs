//! This module serves as the public API for all null-handling logic.
//!
//! A flat optional column is stored as two separate streams: the dense non-null
//! values, and one definition level per row (1 = present, 0 = null). On the Arrow
//! side the same information is an array plus its validity bitmap. The kernels
//! here translate between the two representations and never touch pages or
//! footers.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Stripping and re-applying Arrow validity bitmaps.
pub mod bitmap;

/// Definition level streams (RLE/bit-packing hybrid at bit width 1).
pub mod levels;

//==================================================================================
// 2. Unit Tests (Module-level integration tests)
//==================================================================================

#[cfg(test)]
mod bitmap_tests;
