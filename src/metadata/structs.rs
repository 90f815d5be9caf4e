//! The footer and page header structures, with their Thrift compact codecs.
//!
//! Only the fields this codec reads or writes are modelled. Unknown fields are
//! skipped on read, so files from newer writers still open.

use crate::error::ColumnarError;
use crate::metadata::thrift::{ttype, CompactReader, CompactWriter};
use crate::types::{
    CompressionCodec, ConvertedType, Encoding, LogicalTypeAnnotation, PageType, PhysicalType,
    Repetition, TimeUnit,
};

/// A struct with a Thrift compact encoding.
pub trait ThriftStruct: Sized {
    fn write_to(&self, w: &mut CompactWriter);
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError>;
}

fn missing(struct_name: &str, field: &str) -> ColumnarError {
    ColumnarError::Thrift(format!("{} is missing required field '{}'", struct_name, field))
}

fn write_struct_field<S: ThriftStruct>(w: &mut CompactWriter, field_id: i16, value: &S) {
    w.write_field_header(ttype::STRUCT, field_id);
    value.write_to(w);
}

fn write_struct_list<S: ThriftStruct>(w: &mut CompactWriter, field_id: i16, values: &[S]) {
    w.write_list_field_begin(field_id, ttype::STRUCT, values.len());
    for value in values {
        value.write_to(w);
    }
}

fn read_struct_list<S: ThriftStruct>(r: &mut CompactReader<'_>) -> Result<Vec<S>, ColumnarError> {
    let (elem_type, size) = r.read_list_begin()?;
    if elem_type != ttype::STRUCT {
        return Err(ColumnarError::Thrift(format!("expected a list of structs, found type {}", elem_type)));
    }
    (0..size).map(|_| S::read_from(r)).collect()
}

//==================================================================================
// 1. Small Structs
//==================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl ThriftStruct for KeyValue {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        w.write_string_field(1, &self.key);
        if let Some(value) = &self.value {
            w.write_string_field(2, value);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut key = None;
        let mut value = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::BINARY) => key = Some(r.read_string()?),
                (2, ttype::BINARY) => value = Some(r.read_string()?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            key: key.ok_or_else(|| missing("KeyValue", "key"))?,
            value,
        })
    }
}

/// Column or page statistics. `min_value`/`max_value` follow the column's sort
/// order; the deprecated `min`/`max` are read but never written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
}

impl ThriftStruct for Statistics {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        if let Some(v) = &self.max {
            w.write_binary_field(1, v);
        }
        if let Some(v) = &self.min {
            w.write_binary_field(2, v);
        }
        if let Some(v) = self.null_count {
            w.write_i64_field(3, v);
        }
        if let Some(v) = self.distinct_count {
            w.write_i64_field(4, v);
        }
        if let Some(v) = &self.max_value {
            w.write_binary_field(5, v);
        }
        if let Some(v) = &self.min_value {
            w.write_binary_field(6, v);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut stats = Statistics::default();
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::BINARY) => stats.max = Some(r.read_binary()?),
                (2, ttype::BINARY) => stats.min = Some(r.read_binary()?),
                (3, ttype::I64) => stats.null_count = Some(r.read_i64()?),
                (4, ttype::I64) => stats.distinct_count = Some(r.read_i64()?),
                (5, ttype::BINARY) => stats.max_value = Some(r.read_binary()?),
                (6, ttype::BINARY) => stats.min_value = Some(r.read_binary()?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(stats)
    }
}

//==================================================================================
// 2. The LogicalType Union
//==================================================================================

fn write_empty_member(w: &mut CompactWriter, field_id: i16) {
    w.write_struct_field_begin(field_id);
    w.write_struct_end();
}

fn write_time_unit(w: &mut CompactWriter, field_id: i16, unit: TimeUnit) {
    w.write_struct_field_begin(field_id);
    let member = match unit {
        TimeUnit::Millis => 1,
        TimeUnit::Micros => 2,
        TimeUnit::Nanos => 3,
    };
    write_empty_member(w, member);
    w.write_struct_end();
}

fn read_time_unit(r: &mut CompactReader<'_>) -> Result<TimeUnit, ColumnarError> {
    let mut unit = None;
    r.read_struct_begin();
    while let Some((kind, id)) = r.read_field_begin()? {
        unit = match id {
            1 => Some(TimeUnit::Millis),
            2 => Some(TimeUnit::Micros),
            3 => Some(TimeUnit::Nanos),
            _ => unit,
        };
        r.skip(kind)?;
    }
    r.read_struct_end();
    unit.ok_or_else(|| missing("TimeUnit", "unit"))
}

/// Reads `{1: isAdjustedToUTC, 2: unit}` shared by TIME and TIMESTAMP.
fn read_temporal(r: &mut CompactReader<'_>) -> Result<(bool, TimeUnit), ColumnarError> {
    let mut adjusted = None;
    let mut unit = None;
    r.read_struct_begin();
    while let Some((kind, id)) = r.read_field_begin()? {
        match (id, kind) {
            (1, ttype::BOOL_TRUE | ttype::BOOL_FALSE) => adjusted = Some(r.read_bool()?),
            (2, ttype::STRUCT) => unit = Some(read_time_unit(r)?),
            _ => r.skip(kind)?,
        }
    }
    r.read_struct_end();
    Ok((
        adjusted.ok_or_else(|| missing("TimestampType", "isAdjustedToUTC"))?,
        unit.ok_or_else(|| missing("TimestampType", "unit"))?,
    ))
}

impl ThriftStruct for LogicalTypeAnnotation {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        match *self {
            LogicalTypeAnnotation::String => write_empty_member(w, 1),
            LogicalTypeAnnotation::Map => write_empty_member(w, 2),
            LogicalTypeAnnotation::List => write_empty_member(w, 3),
            LogicalTypeAnnotation::Enum => write_empty_member(w, 4),
            LogicalTypeAnnotation::Decimal { scale, precision } => {
                w.write_struct_field_begin(5);
                w.write_i32_field(1, scale);
                w.write_i32_field(2, precision);
                w.write_struct_end();
            }
            LogicalTypeAnnotation::Date => write_empty_member(w, 6),
            LogicalTypeAnnotation::Time { adjusted_to_utc, unit } => {
                w.write_struct_field_begin(7);
                w.write_bool_field(1, adjusted_to_utc);
                write_time_unit(w, 2, unit);
                w.write_struct_end();
            }
            LogicalTypeAnnotation::Timestamp { adjusted_to_utc, unit } => {
                w.write_struct_field_begin(8);
                w.write_bool_field(1, adjusted_to_utc);
                write_time_unit(w, 2, unit);
                w.write_struct_end();
            }
            LogicalTypeAnnotation::Integer { bit_width, signed } => {
                w.write_struct_field_begin(10);
                w.write_byte_field(1, bit_width);
                w.write_bool_field(2, signed);
                w.write_struct_end();
            }
            LogicalTypeAnnotation::Unknown => write_empty_member(w, 11),
            LogicalTypeAnnotation::Json => write_empty_member(w, 12),
            LogicalTypeAnnotation::Bson => write_empty_member(w, 13),
            LogicalTypeAnnotation::Uuid => write_empty_member(w, 14),
            LogicalTypeAnnotation::Other(id) => write_empty_member(w, id),
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut result = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            if kind != ttype::STRUCT {
                r.skip(kind)?;
                continue;
            }
            let member = match id {
                5 => {
                    let mut scale = 0;
                    let mut precision = None;
                    r.read_struct_begin();
                    while let Some((k, fid)) = r.read_field_begin()? {
                        match (fid, k) {
                            (1, ttype::I32) => scale = r.read_i32()?,
                            (2, ttype::I32) => precision = Some(r.read_i32()?),
                            _ => r.skip(k)?,
                        }
                    }
                    r.read_struct_end();
                    LogicalTypeAnnotation::Decimal {
                        scale,
                        precision: precision.ok_or_else(|| missing("DecimalType", "precision"))?,
                    }
                }
                7 => {
                    let (adjusted_to_utc, unit) = read_temporal(r)?;
                    LogicalTypeAnnotation::Time { adjusted_to_utc, unit }
                }
                8 => {
                    let (adjusted_to_utc, unit) = read_temporal(r)?;
                    LogicalTypeAnnotation::Timestamp { adjusted_to_utc, unit }
                }
                10 => {
                    let mut bit_width = None;
                    let mut signed = None;
                    r.read_struct_begin();
                    while let Some((k, fid)) = r.read_field_begin()? {
                        match (fid, k) {
                            (1, ttype::BYTE) => bit_width = Some(r.read_byte()?),
                            (2, ttype::BOOL_TRUE | ttype::BOOL_FALSE) => signed = Some(r.read_bool()?),
                            _ => r.skip(k)?,
                        }
                    }
                    r.read_struct_end();
                    LogicalTypeAnnotation::Integer {
                        bit_width: bit_width.ok_or_else(|| missing("IntType", "bitWidth"))?,
                        signed: signed.ok_or_else(|| missing("IntType", "isSigned"))?,
                    }
                }
                other => {
                    r.skip(kind)?;
                    match other {
                        1 => LogicalTypeAnnotation::String,
                        2 => LogicalTypeAnnotation::Map,
                        3 => LogicalTypeAnnotation::List,
                        4 => LogicalTypeAnnotation::Enum,
                        6 => LogicalTypeAnnotation::Date,
                        11 => LogicalTypeAnnotation::Unknown,
                        12 => LogicalTypeAnnotation::Json,
                        13 => LogicalTypeAnnotation::Bson,
                        14 => LogicalTypeAnnotation::Uuid,
                        unknown => LogicalTypeAnnotation::Other(unknown),
                    }
                }
            };
            result = Some(member);
        }
        r.read_struct_end();
        result.ok_or_else(|| missing("LogicalType", "member"))
    }
}

//==================================================================================
// 3. Schema
//==================================================================================

/// One node of the flattened schema tree. The first element is the root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaElement {
    pub physical_type: Option<PhysicalType>,
    pub type_length: Option<i32>,
    pub repetition_type: Option<Repetition>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<ConvertedType>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
    pub logical_type: Option<LogicalTypeAnnotation>,
}

impl ThriftStruct for SchemaElement {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        if let Some(t) = self.physical_type {
            w.write_i32_field(1, t.as_i32());
        }
        if let Some(v) = self.type_length {
            w.write_i32_field(2, v);
        }
        if let Some(v) = self.repetition_type {
            w.write_i32_field(3, v.as_i32());
        }
        w.write_string_field(4, &self.name);
        if let Some(v) = self.num_children {
            w.write_i32_field(5, v);
        }
        if let Some(v) = self.converted_type {
            w.write_i32_field(6, v.as_i32());
        }
        if let Some(v) = self.scale {
            w.write_i32_field(7, v);
        }
        if let Some(v) = self.precision {
            w.write_i32_field(8, v);
        }
        if let Some(v) = self.field_id {
            w.write_i32_field(9, v);
        }
        if let Some(v) = &self.logical_type {
            write_struct_field(w, 10, v);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut el = SchemaElement::default();
        let mut name = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::I32) => el.physical_type = Some(PhysicalType::try_from(r.read_i32()?)?),
                (2, ttype::I32) => el.type_length = Some(r.read_i32()?),
                (3, ttype::I32) => el.repetition_type = Some(Repetition::try_from(r.read_i32()?)?),
                (4, ttype::BINARY) => name = Some(r.read_string()?),
                (5, ttype::I32) => el.num_children = Some(r.read_i32()?),
                (6, ttype::I32) => el.converted_type = Some(ConvertedType::try_from(r.read_i32()?)?),
                (7, ttype::I32) => el.scale = Some(r.read_i32()?),
                (8, ttype::I32) => el.precision = Some(r.read_i32()?),
                (9, ttype::I32) => el.field_id = Some(r.read_i32()?),
                (10, ttype::STRUCT) => el.logical_type = Some(LogicalTypeAnnotation::read_from(r)?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        el.name = name.ok_or_else(|| missing("SchemaElement", "name"))?;
        Ok(el)
    }
}

//==================================================================================
// 4. Column Chunks and Row Groups
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetaData {
    pub physical_type: PhysicalType,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: CompressionCodec,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub key_value_metadata: Vec<KeyValue>,
    pub data_page_offset: i64,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
    pub statistics: Option<Statistics>,
}

impl ColumnMetaData {
    /// Byte offset of the first page of the chunk.
    pub fn chunk_start(&self) -> i64 {
        match self.dictionary_page_offset {
            Some(dict) if dict > 0 && dict < self.data_page_offset => dict,
            _ => self.data_page_offset,
        }
    }
}

impl ThriftStruct for ColumnMetaData {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        w.write_i32_field(1, self.physical_type.as_i32());
        w.write_list_field_begin(2, ttype::I32, self.encodings.len());
        for encoding in &self.encodings {
            w.write_i32(encoding.as_i32());
        }
        w.write_list_field_begin(3, ttype::BINARY, self.path_in_schema.len());
        for part in &self.path_in_schema {
            w.write_binary(part.as_bytes());
        }
        w.write_i32_field(4, self.codec.as_i32());
        w.write_i64_field(5, self.num_values);
        w.write_i64_field(6, self.total_uncompressed_size);
        w.write_i64_field(7, self.total_compressed_size);
        if !self.key_value_metadata.is_empty() {
            write_struct_list(w, 8, &self.key_value_metadata);
        }
        w.write_i64_field(9, self.data_page_offset);
        if let Some(v) = self.index_page_offset {
            w.write_i64_field(10, v);
        }
        if let Some(v) = self.dictionary_page_offset {
            w.write_i64_field(11, v);
        }
        if let Some(stats) = &self.statistics {
            write_struct_field(w, 12, stats);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut physical_type = None;
        let mut encodings = Vec::new();
        let mut path_in_schema = Vec::new();
        let mut codec = None;
        let mut num_values = None;
        let mut total_uncompressed_size = None;
        let mut total_compressed_size = None;
        let mut key_value_metadata = Vec::new();
        let mut data_page_offset = None;
        let mut index_page_offset = None;
        let mut dictionary_page_offset = None;
        let mut statistics = None;

        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::I32) => physical_type = Some(PhysicalType::try_from(r.read_i32()?)?),
                (2, ttype::LIST) => {
                    let (_, size) = r.read_list_begin()?;
                    for _ in 0..size {
                        // Encodings this codec does not model are listed, not fatal.
                        if let Ok(encoding) = Encoding::try_from(r.read_i32()?) {
                            encodings.push(encoding);
                        }
                    }
                }
                (3, ttype::LIST) => {
                    let (_, size) = r.read_list_begin()?;
                    for _ in 0..size {
                        path_in_schema.push(r.read_string()?);
                    }
                }
                (4, ttype::I32) => codec = Some(CompressionCodec::try_from(r.read_i32()?)?),
                (5, ttype::I64) => num_values = Some(r.read_i64()?),
                (6, ttype::I64) => total_uncompressed_size = Some(r.read_i64()?),
                (7, ttype::I64) => total_compressed_size = Some(r.read_i64()?),
                (8, ttype::LIST) => key_value_metadata = read_struct_list(r)?,
                (9, ttype::I64) => data_page_offset = Some(r.read_i64()?),
                (10, ttype::I64) => index_page_offset = Some(r.read_i64()?),
                (11, ttype::I64) => dictionary_page_offset = Some(r.read_i64()?),
                (12, ttype::STRUCT) => statistics = Some(Statistics::read_from(r)?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();

        Ok(Self {
            physical_type: physical_type.ok_or_else(|| missing("ColumnMetaData", "type"))?,
            encodings,
            path_in_schema,
            codec: codec.ok_or_else(|| missing("ColumnMetaData", "codec"))?,
            num_values: num_values.ok_or_else(|| missing("ColumnMetaData", "num_values"))?,
            total_uncompressed_size: total_uncompressed_size
                .ok_or_else(|| missing("ColumnMetaData", "total_uncompressed_size"))?,
            total_compressed_size: total_compressed_size
                .ok_or_else(|| missing("ColumnMetaData", "total_compressed_size"))?,
            key_value_metadata,
            data_page_offset: data_page_offset.ok_or_else(|| missing("ColumnMetaData", "data_page_offset"))?,
            index_page_offset,
            dictionary_page_offset,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunk {
    pub file_path: Option<String>,
    pub file_offset: i64,
    pub meta_data: Option<ColumnMetaData>,
}

impl ThriftStruct for ColumnChunk {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        if let Some(path) = &self.file_path {
            w.write_string_field(1, path);
        }
        w.write_i64_field(2, self.file_offset);
        if let Some(meta) = &self.meta_data {
            write_struct_field(w, 3, meta);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut file_path = None;
        let mut file_offset = None;
        let mut meta_data = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::BINARY) => file_path = Some(r.read_string()?),
                (2, ttype::I64) => file_offset = Some(r.read_i64()?),
                (3, ttype::STRUCT) => meta_data = Some(ColumnMetaData::read_from(r)?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            file_path,
            file_offset: file_offset.ok_or_else(|| missing("ColumnChunk", "file_offset"))?,
            meta_data,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: i64,
    pub num_rows: i64,
    pub file_offset: Option<i64>,
    pub total_compressed_size: Option<i64>,
    pub ordinal: Option<i16>,
}

impl ThriftStruct for RowGroup {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        write_struct_list(w, 1, &self.columns);
        w.write_i64_field(2, self.total_byte_size);
        w.write_i64_field(3, self.num_rows);
        if let Some(v) = self.file_offset {
            w.write_i64_field(5, v);
        }
        if let Some(v) = self.total_compressed_size {
            w.write_i64_field(6, v);
        }
        if let Some(v) = self.ordinal {
            w.write_i16_field(7, v);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut columns = None;
        let mut total_byte_size = None;
        let mut num_rows = None;
        let mut file_offset = None;
        let mut total_compressed_size = None;
        let mut ordinal = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::LIST) => columns = Some(read_struct_list(r)?),
                (2, ttype::I64) => total_byte_size = Some(r.read_i64()?),
                (3, ttype::I64) => num_rows = Some(r.read_i64()?),
                (5, ttype::I64) => file_offset = Some(r.read_i64()?),
                (6, ttype::I64) => total_compressed_size = Some(r.read_i64()?),
                (7, ttype::I16) => ordinal = Some(r.read_i16()?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            columns: columns.ok_or_else(|| missing("RowGroup", "columns"))?,
            total_byte_size: total_byte_size.ok_or_else(|| missing("RowGroup", "total_byte_size"))?,
            num_rows: num_rows.ok_or_else(|| missing("RowGroup", "num_rows"))?,
            file_offset,
            total_compressed_size,
            ordinal,
        })
    }
}

//==================================================================================
// 5. File Metadata
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroup>,
    pub key_value_metadata: Vec<KeyValue>,
    pub created_by: Option<String>,
}

impl FileMetaData {
    /// Looks up a key/value entry by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.key_value_metadata
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_deref())
    }
}

impl ThriftStruct for FileMetaData {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        w.write_i32_field(1, self.version);
        write_struct_list(w, 2, &self.schema);
        w.write_i64_field(3, self.num_rows);
        write_struct_list(w, 4, &self.row_groups);
        if !self.key_value_metadata.is_empty() {
            write_struct_list(w, 5, &self.key_value_metadata);
        }
        if let Some(created_by) = &self.created_by {
            w.write_string_field(6, created_by);
        }
        // column_orders: TYPE_ORDER for every leaf, so readers trust min/max.
        let leaves = self.schema.len().saturating_sub(1);
        w.write_list_field_begin(7, ttype::STRUCT, leaves);
        for _ in 0..leaves {
            w.write_struct_begin();
            write_empty_member(w, 1);
            w.write_struct_end();
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut version = None;
        let mut schema = None;
        let mut num_rows = None;
        let mut row_groups = None;
        let mut key_value_metadata = Vec::new();
        let mut created_by = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::I32) => version = Some(r.read_i32()?),
                (2, ttype::LIST) => schema = Some(read_struct_list(r)?),
                (3, ttype::I64) => num_rows = Some(r.read_i64()?),
                (4, ttype::LIST) => row_groups = Some(read_struct_list(r)?),
                (5, ttype::LIST) => key_value_metadata = read_struct_list(r)?,
                (6, ttype::BINARY) => created_by = Some(r.read_string()?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            version: version.ok_or_else(|| missing("FileMetaData", "version"))?,
            schema: schema.ok_or_else(|| missing("FileMetaData", "schema"))?,
            num_rows: num_rows.ok_or_else(|| missing("FileMetaData", "num_rows"))?,
            row_groups: row_groups.ok_or_else(|| missing("FileMetaData", "row_groups"))?,
            key_value_metadata,
            created_by,
        })
    }
}

//==================================================================================
// 6. Page Headers
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
    pub statistics: Option<Statistics>,
}

impl ThriftStruct for DataPageHeader {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        w.write_i32_field(1, self.num_values);
        w.write_i32_field(2, self.encoding.as_i32());
        w.write_i32_field(3, self.definition_level_encoding.as_i32());
        w.write_i32_field(4, self.repetition_level_encoding.as_i32());
        if let Some(stats) = &self.statistics {
            write_struct_field(w, 5, stats);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut num_values = None;
        let mut encoding = None;
        let mut def_encoding = None;
        let mut rep_encoding = None;
        let mut statistics = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::I32) => num_values = Some(r.read_i32()?),
                (2, ttype::I32) => encoding = Some(Encoding::try_from(r.read_i32()?)?),
                (3, ttype::I32) => def_encoding = Some(Encoding::try_from(r.read_i32()?)?),
                (4, ttype::I32) => rep_encoding = Some(Encoding::try_from(r.read_i32()?)?),
                (5, ttype::STRUCT) => statistics = Some(Statistics::read_from(r)?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            num_values: num_values.ok_or_else(|| missing("DataPageHeader", "num_values"))?,
            encoding: encoding.ok_or_else(|| missing("DataPageHeader", "encoding"))?,
            definition_level_encoding: def_encoding.unwrap_or(Encoding::Rle),
            repetition_level_encoding: rep_encoding.unwrap_or(Encoding::Rle),
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: Option<bool>,
}

impl ThriftStruct for DictionaryPageHeader {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        w.write_i32_field(1, self.num_values);
        w.write_i32_field(2, self.encoding.as_i32());
        if let Some(v) = self.is_sorted {
            w.write_bool_field(3, v);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut num_values = None;
        let mut encoding = None;
        let mut is_sorted = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::I32) => num_values = Some(r.read_i32()?),
                (2, ttype::I32) => encoding = Some(Encoding::try_from(r.read_i32()?)?),
                (3, ttype::BOOL_TRUE | ttype::BOOL_FALSE) => is_sorted = Some(r.read_bool()?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            num_values: num_values.ok_or_else(|| missing("DictionaryPageHeader", "num_values"))?,
            encoding: encoding.ok_or_else(|| missing("DictionaryPageHeader", "encoding"))?,
            is_sorted,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    /// Absent means compressed.
    pub is_compressed: Option<bool>,
    pub statistics: Option<Statistics>,
}

impl ThriftStruct for DataPageHeaderV2 {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        w.write_i32_field(1, self.num_values);
        w.write_i32_field(2, self.num_nulls);
        w.write_i32_field(3, self.num_rows);
        w.write_i32_field(4, self.encoding.as_i32());
        w.write_i32_field(5, self.definition_levels_byte_length);
        w.write_i32_field(6, self.repetition_levels_byte_length);
        if let Some(v) = self.is_compressed {
            w.write_bool_field(7, v);
        }
        if let Some(stats) = &self.statistics {
            write_struct_field(w, 8, stats);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut num_values = None;
        let mut num_nulls = None;
        let mut num_rows = None;
        let mut encoding = None;
        let mut def_len = None;
        let mut rep_len = None;
        let mut is_compressed = None;
        let mut statistics = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::I32) => num_values = Some(r.read_i32()?),
                (2, ttype::I32) => num_nulls = Some(r.read_i32()?),
                (3, ttype::I32) => num_rows = Some(r.read_i32()?),
                (4, ttype::I32) => encoding = Some(Encoding::try_from(r.read_i32()?)?),
                (5, ttype::I32) => def_len = Some(r.read_i32()?),
                (6, ttype::I32) => rep_len = Some(r.read_i32()?),
                (7, ttype::BOOL_TRUE | ttype::BOOL_FALSE) => is_compressed = Some(r.read_bool()?),
                (8, ttype::STRUCT) => statistics = Some(Statistics::read_from(r)?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            num_values: num_values.ok_or_else(|| missing("DataPageHeaderV2", "num_values"))?,
            num_nulls: num_nulls.ok_or_else(|| missing("DataPageHeaderV2", "num_nulls"))?,
            num_rows: num_rows.ok_or_else(|| missing("DataPageHeaderV2", "num_rows"))?,
            encoding: encoding.ok_or_else(|| missing("DataPageHeaderV2", "encoding"))?,
            definition_levels_byte_length: def_len
                .ok_or_else(|| missing("DataPageHeaderV2", "definition_levels_byte_length"))?,
            repetition_levels_byte_length: rep_len
                .ok_or_else(|| missing("DataPageHeaderV2", "repetition_levels_byte_length"))?,
            is_compressed,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl ThriftStruct for PageHeader {
    fn write_to(&self, w: &mut CompactWriter) {
        w.write_struct_begin();
        w.write_i32_field(1, self.page_type.as_i32());
        w.write_i32_field(2, self.uncompressed_page_size);
        w.write_i32_field(3, self.compressed_page_size);
        if let Some(v) = self.crc {
            w.write_i32_field(4, v);
        }
        if let Some(h) = &self.data_page_header {
            write_struct_field(w, 5, h);
        }
        if let Some(h) = &self.dictionary_page_header {
            write_struct_field(w, 7, h);
        }
        if let Some(h) = &self.data_page_header_v2 {
            write_struct_field(w, 8, h);
        }
        w.write_struct_end();
    }

    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ColumnarError> {
        let mut page_type = None;
        let mut uncompressed = None;
        let mut compressed = None;
        let mut crc = None;
        let mut data_page_header = None;
        let mut dictionary_page_header = None;
        let mut data_page_header_v2 = None;
        r.read_struct_begin();
        while let Some((kind, id)) = r.read_field_begin()? {
            match (id, kind) {
                (1, ttype::I32) => page_type = Some(PageType::try_from(r.read_i32()?)?),
                (2, ttype::I32) => uncompressed = Some(r.read_i32()?),
                (3, ttype::I32) => compressed = Some(r.read_i32()?),
                (4, ttype::I32) => crc = Some(r.read_i32()?),
                (5, ttype::STRUCT) => data_page_header = Some(DataPageHeader::read_from(r)?),
                (7, ttype::STRUCT) => dictionary_page_header = Some(DictionaryPageHeader::read_from(r)?),
                (8, ttype::STRUCT) => data_page_header_v2 = Some(DataPageHeaderV2::read_from(r)?),
                _ => r.skip(kind)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            page_type: page_type.ok_or_else(|| missing("PageHeader", "type"))?,
            uncompressed_page_size: uncompressed.ok_or_else(|| missing("PageHeader", "uncompressed_page_size"))?,
            compressed_page_size: compressed.ok_or_else(|| missing("PageHeader", "compressed_page_size"))?,
            crc,
            data_page_header,
            dictionary_page_header,
            data_page_header_v2,
        })
    }
}

/// Serializes any Thrift struct into a fresh buffer.
pub fn to_bytes<S: ThriftStruct>(value: &S) -> Vec<u8> {
    let mut w = CompactWriter::new();
    value.write_to(&mut w);
    w.into_bytes()
}

/// Deserializes a Thrift struct from the front of `bytes`, returning it with the
/// number of bytes consumed.
pub fn from_bytes<S: ThriftStruct>(bytes: &[u8]) -> Result<(S, usize), ColumnarError> {
    let mut r = CompactReader::new(bytes);
    let value = S::read_from(&mut r)?;
    Ok((value, r.position()))
}

//==================================================================================
// 7. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_column_meta() -> ColumnMetaData {
        ColumnMetaData {
            physical_type: PhysicalType::Int64,
            encodings: vec![Encoding::PlainDictionary, Encoding::Rle, Encoding::Plain],
            path_in_schema: vec!["amount".to_string()],
            codec: CompressionCodec::Snappy,
            num_values: 1000,
            total_uncompressed_size: 9000,
            total_compressed_size: 4000,
            key_value_metadata: Vec::new(),
            data_page_offset: 120,
            index_page_offset: None,
            dictionary_page_offset: Some(4),
            statistics: Some(Statistics {
                null_count: Some(3),
                min_value: Some(1i64.to_le_bytes().to_vec()),
                max_value: Some(999i64.to_le_bytes().to_vec()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_file_metadata_roundtrip() {
        // Arrange
        let meta = FileMetaData {
            version: 1,
            schema: vec![
                SchemaElement {
                    name: "spark_schema".to_string(),
                    num_children: Some(1),
                    ..Default::default()
                },
                SchemaElement {
                    name: "amount".to_string(),
                    physical_type: Some(PhysicalType::Int64),
                    repetition_type: Some(Repetition::Optional),
                    converted_type: Some(ConvertedType::Decimal),
                    precision: Some(9),
                    scale: Some(1),
                    logical_type: Some(LogicalTypeAnnotation::Decimal { scale: 1, precision: 9 }),
                    ..Default::default()
                },
            ],
            num_rows: 1000,
            row_groups: vec![RowGroup {
                columns: vec![ColumnChunk {
                    file_path: None,
                    file_offset: 4,
                    meta_data: Some(sample_column_meta()),
                }],
                total_byte_size: 9000,
                num_rows: 1000,
                file_offset: Some(4),
                total_compressed_size: Some(4000),
                ordinal: Some(0),
            }],
            key_value_metadata: vec![KeyValue {
                key: "k".to_string(),
                value: Some("v".to_string()),
            }],
            created_by: Some("test".to_string()),
        };

        // Act
        let bytes = to_bytes(&meta);
        let (decoded, consumed) = from_bytes::<FileMetaData>(&bytes).unwrap();

        // Assert
        assert_eq!(decoded, meta);
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.metadata_value("k"), Some("v"));
        assert_eq!(decoded.row_groups[0].columns[0].meta_data.as_ref().unwrap().chunk_start(), 4);
    }

    #[test]
    fn test_page_header_v2_roundtrip() {
        let header = PageHeader {
            page_type: PageType::DataPageV2,
            uncompressed_page_size: 100,
            compressed_page_size: 60,
            crc: None,
            data_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: Some(DataPageHeaderV2 {
                num_values: 10,
                num_nulls: 2,
                num_rows: 10,
                encoding: Encoding::RleDictionary,
                definition_levels_byte_length: 3,
                repetition_levels_byte_length: 0,
                is_compressed: Some(true),
                statistics: None,
            }),
        };
        let bytes = to_bytes(&header);
        let (decoded, _) = from_bytes::<PageHeader>(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_logical_type_members() {
        for annotation in [
            LogicalTypeAnnotation::String,
            LogicalTypeAnnotation::Date,
            LogicalTypeAnnotation::Timestamp { adjusted_to_utc: true, unit: TimeUnit::Micros },
            LogicalTypeAnnotation::Integer { bit_width: 16, signed: false },
            LogicalTypeAnnotation::Decimal { scale: 2, precision: 20 },
        ] {
            let bytes = to_bytes(&annotation);
            let (decoded, _) = from_bytes::<LogicalTypeAnnotation>(&bytes).unwrap();
            assert_eq!(decoded, annotation);
        }
    }

    #[test]
    fn test_missing_required_field() {
        // An empty struct: a lone stop byte.
        let result = from_bytes::<PageHeader>(&[0x00]);
        assert!(matches!(result, Err(ColumnarError::Thrift(_))));
    }
}
