// In: src/types/physical.rs

//! The on-disk vocabulary of the file format: physical types, repetition,
//! converted-type annotations, encodings, codecs and page kinds.
//!
//! Every enum here mirrors a Thrift enum of the footer. The numeric values are
//! part of the format and must never be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ColumnarError;

//==================================================================================
// 1. Thrift-backed Enums
//==================================================================================

/// Declares a Thrift-backed enum with its wire value and display name.
macro_rules! thrift_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $value:literal => $display:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The value written to the Thrift footer.
            pub fn as_i32(self) -> i32 {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = ColumnarError;

            fn try_from(value: i32) -> Result<Self, ColumnarError> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(ColumnarError::Thrift(format!(
                        "unknown {} value {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $display),+
                })
            }
        }
    };
}

thrift_enum! {
    /// The storage representation of a leaf column.
    PhysicalType {
        Boolean = 0 => "BOOLEAN",
        Int32 = 1 => "INT32",
        Int64 = 2 => "INT64",
        Int96 = 3 => "INT96",
        Float = 4 => "FLOAT",
        Double = 5 => "DOUBLE",
        ByteArray = 6 => "BYTE_ARRAY",
        FixedLenByteArray = 7 => "FIXED_LEN_BYTE_ARRAY",
    }
}

thrift_enum! {
    Repetition {
        Required = 0 => "REQUIRED",
        Optional = 1 => "OPTIONAL",
        Repeated = 2 => "REPEATED",
    }
}

thrift_enum! {
    /// Legacy logical annotation carried in `SchemaElement.converted_type`.
    ConvertedType {
        Utf8 = 0 => "UTF8",
        Map = 1 => "MAP",
        MapKeyValue = 2 => "MAP_KEY_VALUE",
        List = 3 => "LIST",
        Enum = 4 => "ENUM",
        Decimal = 5 => "DECIMAL",
        Date = 6 => "DATE",
        TimeMillis = 7 => "TIME_MILLIS",
        TimeMicros = 8 => "TIME_MICROS",
        TimestampMillis = 9 => "TIMESTAMP_MILLIS",
        TimestampMicros = 10 => "TIMESTAMP_MICROS",
        Uint8 = 11 => "UINT_8",
        Uint16 = 12 => "UINT_16",
        Uint32 = 13 => "UINT_32",
        Uint64 = 14 => "UINT_64",
        Int8 = 15 => "INT_8",
        Int16 = 16 => "INT_16",
        Int32 = 17 => "INT_32",
        Int64 = 18 => "INT_64",
        Json = 19 => "JSON",
        Bson = 20 => "BSON",
        Interval = 21 => "INTERVAL",
    }
}

thrift_enum! {
    Encoding {
        Plain = 0 => "PLAIN",
        PlainDictionary = 2 => "PLAIN_DICTIONARY",
        Rle = 3 => "RLE",
        BitPacked = 4 => "BIT_PACKED",
        DeltaBinaryPacked = 5 => "DELTA_BINARY_PACKED",
        DeltaLengthByteArray = 6 => "DELTA_LENGTH_BYTE_ARRAY",
        DeltaByteArray = 7 => "DELTA_BYTE_ARRAY",
        RleDictionary = 8 => "RLE_DICTIONARY",
        ByteStreamSplit = 9 => "BYTE_STREAM_SPLIT",
    }
}

thrift_enum! {
    CompressionCodec {
        Uncompressed = 0 => "UNCOMPRESSED",
        Snappy = 1 => "SNAPPY",
        Gzip = 2 => "GZIP",
        Lzo = 3 => "LZO",
        Brotli = 4 => "BROTLI",
        Lz4 = 5 => "LZ4",
        Zstd = 6 => "ZSTD",
        Lz4Raw = 7 => "LZ4_RAW",
    }
}

thrift_enum! {
    PageType {
        DataPage = 0 => "DATA_PAGE",
        IndexPage = 1 => "INDEX_PAGE",
        DictionaryPage = 2 => "DICTIONARY_PAGE",
        DataPageV2 = 3 => "DATA_PAGE_V2",
    }
}

impl Encoding {
    /// Both dictionary tags share the same index stream layout.
    pub fn is_dictionary(self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

//==================================================================================
// 2. The LogicalType Union (SchemaElement field 10)
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

/// The newer logical annotation union. Files written by modern writers may carry
/// it without a converted type, so the reader understands both.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalTypeAnnotation {
    String,
    Map,
    List,
    Enum,
    Decimal { scale: i32, precision: i32 },
    Date,
    Time { adjusted_to_utc: bool, unit: TimeUnit },
    Timestamp { adjusted_to_utc: bool, unit: TimeUnit },
    Integer { bit_width: i8, signed: bool },
    Unknown,
    Json,
    Bson,
    Uuid,
    /// A union member this codec does not model, kept by field id.
    Other(i16),
}

//==================================================================================
// 3. Normalized Column Annotation
//==================================================================================

/// The one annotation the rest of the crate reasons about, folded from either the
/// converted type or the logical type union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnAnnotation {
    None,
    Int { bit_width: u8, signed: bool },
    Decimal { precision: u8, scale: i8 },
    Date,
    TimestampMillis,
    TimestampMicros,
    TimestampNanos,
    Time,
    Utf8,
    Json,
    Bson,
    Enum,
    Uuid,
    Interval,
    Nested,
    /// A logical type union member this codec has no mapping for.
    Unrecognized(i16),
}

impl fmt::Display for ColumnAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnAnnotation::None => f.write_str("NONE"),
            ColumnAnnotation::Int { bit_width, signed: true } => write!(f, "INT_{}", bit_width),
            ColumnAnnotation::Int { bit_width, signed: false } => write!(f, "UINT_{}", bit_width),
            ColumnAnnotation::Decimal { precision, scale } => {
                write!(f, "DECIMAL({},{})", precision, scale)
            }
            ColumnAnnotation::Date => f.write_str("DATE"),
            ColumnAnnotation::TimestampMillis => f.write_str("TIMESTAMP_MILLIS"),
            ColumnAnnotation::TimestampMicros => f.write_str("TIMESTAMP_MICROS"),
            ColumnAnnotation::TimestampNanos => f.write_str("TIMESTAMP_NANOS"),
            ColumnAnnotation::Time => f.write_str("TIME"),
            ColumnAnnotation::Utf8 => f.write_str("UTF8"),
            ColumnAnnotation::Json => f.write_str("JSON"),
            ColumnAnnotation::Bson => f.write_str("BSON"),
            ColumnAnnotation::Enum => f.write_str("ENUM"),
            ColumnAnnotation::Uuid => f.write_str("UUID"),
            ColumnAnnotation::Interval => f.write_str("INTERVAL"),
            ColumnAnnotation::Nested => f.write_str("NESTED"),
            ColumnAnnotation::Unrecognized(id) => write!(f, "LOGICAL_TYPE({})", id),
        }
    }
}

/// The ordering used for min/max statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Signed,
    Unsigned,
}

//==================================================================================
// 4. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_are_stable() {
        assert_eq!(PhysicalType::FixedLenByteArray.as_i32(), 7);
        assert_eq!(ConvertedType::TimestampMicros.as_i32(), 10);
        assert_eq!(Encoding::RleDictionary.as_i32(), 8);
        assert_eq!(CompressionCodec::Zstd.as_i32(), 6);
        assert_eq!(PageType::DataPageV2.as_i32(), 3);
    }

    #[test]
    fn test_try_from_rejects_unknown_values() {
        assert_eq!(Encoding::try_from(2).unwrap(), Encoding::PlainDictionary);
        assert!(matches!(Encoding::try_from(1), Err(ColumnarError::Thrift(_))));
        assert!(matches!(PhysicalType::try_from(42), Err(ColumnarError::Thrift(_))));
    }

    #[test]
    fn test_display_uses_format_names() {
        assert_eq!(ConvertedType::Uint8.to_string(), "UINT_8");
        assert_eq!(
            ColumnAnnotation::Decimal { precision: 9, scale: 1 }.to_string(),
            "DECIMAL(9,1)"
        );
        assert_eq!(ColumnAnnotation::Int { bit_width: 16, signed: false }.to_string(), "UINT_16");
    }
}
