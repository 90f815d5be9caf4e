// In: src/error.rs

//! This module defines the single, unified error type for the entire columnar codec.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColumnarError {
    // =========================================================================
    // === High-Level, Semantic Errors (file and schema level)
    // =========================================================================
    /// The trailer magic, leading magic, or footer length is inconsistent, or
    /// the Thrift footer itself could not be parsed.
    #[error("Malformed footer: {0}")]
    MalformedFooter(String),

    /// A requested logical type cannot be produced from the stored physical column.
    #[error("Column '{column}' stored as {physical} cannot be read as {requested}")]
    SchemaIncompatible {
        column: String,
        physical: String,
        requested: String,
    },

    /// A page header or body ended early, or its contents failed to decode.
    #[error("Truncated or corrupt page in column '{column}': {detail}")]
    TruncatedPage { column: String, detail: String },

    /// Raised inside a column writer when the dictionary outgrows its byte budget.
    /// The writer handles it by switching to PLAIN; it never reaches callers.
    #[error("Dictionary exceeded its configured size limit")]
    DictionaryOverflow,

    #[error("Unsupported logical type: {0}")]
    UnsupportedLogicalType(String),

    #[error("Unsupported data type for this operation: {0}")]
    UnsupportedType(String),

    /// A column reader that already failed was asked for more data.
    #[error("Column '{column}' is unreadable after an earlier failure: {reason}")]
    ColumnFailed { column: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, raised while handling configs or
    /// the embedded logical schema.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An error from a safe byte-casting operation failing.
    #[error("Byte slice casting error: {0}")]
    PodCast(String), // Manual `From` impl is needed as bytemuck::PodCastError doesn't impl Error

    // =========================================================================
    // === Low-Level Kernel Errors
    // =========================================================================
    #[error("Buffer length mismatch: expected a multiple of {0}, got {1}")]
    BufferMismatch(usize, usize),

    #[error("Compression codec failed: {0}")]
    Compression(String),

    #[error("Thrift compact protocol error: {0}")]
    Thrift(String),

    #[error("RLE decoding error: {0}")]
    RleDecodeError(String),

    #[error("LEB128 decoding error: {0}")]
    Leb128DecodeError(String),

    #[error("Bitpack decoding failed due to truncated buffer or data corruption")]
    BitpackDecodeError,

    #[error("Bitpack encoding error: value {0} exceeds bit width {1}")]
    BitpackEncodeError(u64, u8),

    #[error("PLAIN decoding error: {0}")]
    PlainDecodeError(String),

    #[error("Dictionary encoding/decoding failed: {0}")]
    DictionaryError(String),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<bytemuck::PodCastError> for ColumnarError {
    fn from(err: bytemuck::PodCastError) -> Self {
        ColumnarError::PodCast(err.to_string())
    }
}

impl From<ColumnarError> for arrow::error::ArrowError {
    fn from(err: ColumnarError) -> Self {
        match err {
            ColumnarError::Arrow(inner) => inner,
            other => arrow::error::ArrowError::ExternalError(Box::new(other)),
        }
    }
}

impl ColumnarError {
    /// True for kernel-level failures that mean the page bytes themselves are bad.
    pub(crate) fn is_page_corruption(&self) -> bool {
        matches!(
            self,
            ColumnarError::Compression(_)
                | ColumnarError::Thrift(_)
                | ColumnarError::RleDecodeError(_)
                | ColumnarError::Leb128DecodeError(_)
                | ColumnarError::BitpackDecodeError
                | ColumnarError::PlainDecodeError(_)
                | ColumnarError::DictionaryError(_)
        )
    }
}

/// Crate-wide result alias.
pub type Result<T, E = ColumnarError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_incompatible_message_names_column_and_types() {
        let err = ColumnarError::SchemaIncompatible {
            column: "event_time".to_string(),
            physical: "BYTE_ARRAY (UTF8)".to_string(),
            requested: "Timestamp(Microsecond, None)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("event_time"));
        assert!(msg.contains("BYTE_ARRAY (UTF8)"));
        assert!(msg.contains("Timestamp"));
    }

    #[test]
    fn test_arrow_error_roundtrip_preserves_inner() {
        let inner = arrow::error::ArrowError::ComputeError("boom".into());
        let wrapped: ColumnarError = inner.into();
        let back: arrow::error::ArrowError = wrapped.into();
        assert!(matches!(back, arrow::error::ArrowError::ComputeError(_)));

        let external: arrow::error::ArrowError = ColumnarError::DictionaryOverflow.into();
        assert!(matches!(external, arrow::error::ArrowError::ExternalError(_)));
    }

    #[test]
    fn test_page_corruption_classification() {
        assert!(ColumnarError::BitpackDecodeError.is_page_corruption());
        assert!(ColumnarError::Thrift("eof".into()).is_page_corruption());
        assert!(!ColumnarError::MalformedFooter("x".into()).is_page_corruption());
    }
}
