//! A minimal implementation of the Thrift compact protocol, enough to read and
//! write the file footer and page headers.
//!
//! Every field is introduced by a header byte. When the field id is 1..=15 above
//! the previous id in the same struct, the header is `(delta << 4) | type`;
//! otherwise it is the type byte followed by the id as a zigzag varint. Booleans
//! live in the header type itself. A zero byte closes a struct.

use std::io::Cursor;

use crate::error::ColumnarError;
use crate::kernels::leb128;

/// Compact protocol type codes.
pub mod ttype {
    pub const STOP: u8 = 0;
    pub const BOOL_TRUE: u8 = 1;
    pub const BOOL_FALSE: u8 = 2;
    pub const BYTE: u8 = 3;
    pub const I16: u8 = 4;
    pub const I32: u8 = 5;
    pub const I64: u8 = 6;
    pub const DOUBLE: u8 = 7;
    pub const BINARY: u8 = 8;
    pub const LIST: u8 = 9;
    pub const SET: u8 = 10;
    pub const MAP: u8 = 11;
    pub const STRUCT: u8 = 12;
}

/// Nesting bound for skipping unknown fields.
const MAX_SKIP_DEPTH: usize = 64;

fn thrift_err(msg: impl Into<String>) -> ColumnarError {
    ColumnarError::Thrift(msg.into())
}

//==================================================================================
// 1. Writer
//==================================================================================

#[derive(Debug, Default)]
pub struct CompactWriter {
    buf: Vec<u8>,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
}

impl CompactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_varint(&mut self, value: u64) {
        // Encoding a u64 into a Vec cannot fail.
        let _ = leb128::encode_one(value, &mut self.buf);
    }

    fn write_zigzag(&mut self, value: i64) {
        self.write_varint(leb128::zigzag_encode(value));
    }

    pub fn write_field_header(&mut self, type_code: u8, field_id: i16) {
        let delta = field_id.wrapping_sub(self.last_field_id);
        if delta > 0 && delta <= 15 {
            self.buf.push(((delta as u8) << 4) | type_code);
        } else {
            self.buf.push(type_code);
            self.write_zigzag(field_id as i64);
        }
        self.last_field_id = field_id;
    }

    pub fn write_struct_begin(&mut self) {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    pub fn write_struct_end(&mut self) {
        self.buf.push(ttype::STOP);
        self.last_field_id = self.field_id_stack.pop().unwrap_or(0);
    }

    /// Writes a struct-typed field header and opens the nested struct.
    pub fn write_struct_field_begin(&mut self, field_id: i16) {
        self.write_field_header(ttype::STRUCT, field_id);
        self.write_struct_begin();
    }

    pub fn write_bool_field(&mut self, field_id: i16, value: bool) {
        let code = if value { ttype::BOOL_TRUE } else { ttype::BOOL_FALSE };
        self.write_field_header(code, field_id);
    }

    pub fn write_byte_field(&mut self, field_id: i16, value: i8) {
        self.write_field_header(ttype::BYTE, field_id);
        self.buf.push(value as u8);
    }

    pub fn write_i16_field(&mut self, field_id: i16, value: i16) {
        self.write_field_header(ttype::I16, field_id);
        self.write_zigzag(value as i64);
    }

    pub fn write_i32_field(&mut self, field_id: i16, value: i32) {
        self.write_field_header(ttype::I32, field_id);
        self.write_zigzag(value as i64);
    }

    pub fn write_i64_field(&mut self, field_id: i16, value: i64) {
        self.write_field_header(ttype::I64, field_id);
        self.write_zigzag(value);
    }

    pub fn write_binary_field(&mut self, field_id: i16, value: &[u8]) {
        self.write_field_header(ttype::BINARY, field_id);
        self.write_binary(value);
    }

    pub fn write_string_field(&mut self, field_id: i16, value: &str) {
        self.write_binary_field(field_id, value.as_bytes());
    }

    pub fn write_list_field_begin(&mut self, field_id: i16, elem_type: u8, size: usize) {
        self.write_field_header(ttype::LIST, field_id);
        self.write_list_begin(elem_type, size);
    }

    pub fn write_list_begin(&mut self, elem_type: u8, size: usize) {
        if size < 15 {
            self.buf.push(((size as u8) << 4) | elem_type);
        } else {
            self.buf.push(0xF0 | elem_type);
            self.write_varint(size as u64);
        }
    }

    /// A bare i32, as a list element.
    pub fn write_i32(&mut self, value: i32) {
        self.write_zigzag(value as i64);
    }

    /// A bare length-prefixed byte string, as a list element.
    pub fn write_binary(&mut self, value: &[u8]) {
        self.write_varint(value.len() as u64);
        self.buf.extend_from_slice(value);
    }
}

//==================================================================================
// 2. Reader
//==================================================================================

#[derive(Debug)]
pub struct CompactReader<'a> {
    cursor: Cursor<&'a [u8]>,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
    pending_bool: Option<bool>,
}

impl<'a> CompactReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            last_field_id: 0,
            field_id_stack: Vec::new(),
            pending_bool: None,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    fn read_u8(&mut self) -> Result<u8, ColumnarError> {
        let pos = self.position();
        let byte = *self
            .cursor
            .get_ref()
            .get(pos)
            .ok_or_else(|| thrift_err("unexpected end of input"))?;
        self.cursor.set_position((pos + 1) as u64);
        Ok(byte)
    }

    fn read_varint(&mut self) -> Result<u64, ColumnarError> {
        leb128::decode_one::<u64>(&mut self.cursor).map_err(|e| thrift_err(e.to_string()))
    }

    fn read_zigzag(&mut self) -> Result<i64, ColumnarError> {
        Ok(leb128::zigzag_decode(self.read_varint()?))
    }

    pub fn read_struct_begin(&mut self) {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    pub fn read_struct_end(&mut self) {
        self.last_field_id = self.field_id_stack.pop().unwrap_or(0);
    }

    /// Reads the next field header, or `None` at the end of the struct.
    pub fn read_field_begin(&mut self) -> Result<Option<(u8, i16)>, ColumnarError> {
        let header = self.read_u8()?;
        let type_code = header & 0x0F;
        if type_code == ttype::STOP {
            return Ok(None);
        }

        let delta = (header >> 4) as i16;
        let field_id = if delta == 0 {
            i16::try_from(self.read_zigzag()?).map_err(|_| thrift_err("field id out of range"))?
        } else {
            self.last_field_id.wrapping_add(delta)
        };
        self.last_field_id = field_id;

        match type_code {
            ttype::BOOL_TRUE => self.pending_bool = Some(true),
            ttype::BOOL_FALSE => self.pending_bool = Some(false),
            _ => {}
        }
        Ok(Some((type_code, field_id)))
    }

    pub fn read_bool(&mut self) -> Result<bool, ColumnarError> {
        match self.pending_bool.take() {
            Some(value) => Ok(value),
            // Inside a list, booleans take one byte each.
            None => Ok(self.read_u8()? == ttype::BOOL_TRUE),
        }
    }

    pub fn read_byte(&mut self) -> Result<i8, ColumnarError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, ColumnarError> {
        i16::try_from(self.read_zigzag()?).map_err(|_| thrift_err("i16 out of range"))
    }

    pub fn read_i32(&mut self) -> Result<i32, ColumnarError> {
        i32::try_from(self.read_zigzag()?).map_err(|_| thrift_err("i32 out of range"))
    }

    pub fn read_i64(&mut self) -> Result<i64, ColumnarError> {
        self.read_zigzag()
    }

    pub fn read_double(&mut self) -> Result<f64, ColumnarError> {
        let pos = self.position();
        let raw: [u8; 8] = self
            .cursor
            .get_ref()
            .get(pos..pos + 8)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| thrift_err("truncated double"))?;
        self.cursor.set_position((pos + 8) as u64);
        Ok(f64::from_le_bytes(raw))
    }

    pub fn read_binary(&mut self) -> Result<Vec<u8>, ColumnarError> {
        let len = self.read_varint()? as usize;
        let pos = self.position();
        if len > self.remaining() {
            return Err(thrift_err(format!(
                "binary of {} bytes exceeds the {} remaining",
                len,
                self.remaining()
            )));
        }
        let bytes = self.cursor.get_ref()[pos..pos + len].to_vec();
        self.cursor.set_position((pos + len) as u64);
        Ok(bytes)
    }

    pub fn read_string(&mut self) -> Result<String, ColumnarError> {
        String::from_utf8(self.read_binary()?).map_err(|e| thrift_err(format!("invalid UTF-8: {}", e)))
    }

    /// Reads a list header, returning the element type and count.
    pub fn read_list_begin(&mut self) -> Result<(u8, usize), ColumnarError> {
        let header = self.read_u8()?;
        let elem_type = header & 0x0F;
        let short_size = (header >> 4) as usize;
        let size = if short_size == 15 {
            self.read_varint()? as usize
        } else {
            short_size
        };
        // Every element occupies at least one byte.
        if size > self.remaining() {
            return Err(thrift_err(format!("list of {} elements exceeds the input", size)));
        }
        Ok((elem_type, size))
    }

    /// Skips a value of the given type, including nested containers.
    pub fn skip(&mut self, type_code: u8) -> Result<(), ColumnarError> {
        self.skip_with_depth(type_code, 0)
    }

    fn skip_with_depth(&mut self, type_code: u8, depth: usize) -> Result<(), ColumnarError> {
        if depth > MAX_SKIP_DEPTH {
            return Err(thrift_err("nesting too deep"));
        }
        match type_code {
            ttype::BOOL_TRUE | ttype::BOOL_FALSE => {
                self.read_bool()?;
            }
            ttype::BYTE => {
                self.read_u8()?;
            }
            ttype::I16 | ttype::I32 | ttype::I64 => {
                self.read_varint()?;
            }
            ttype::DOUBLE => {
                self.read_double()?;
            }
            ttype::BINARY => {
                self.read_binary()?;
            }
            ttype::LIST | ttype::SET => {
                let (elem_type, size) = self.read_list_begin()?;
                for _ in 0..size {
                    self.skip_with_depth(elem_type, depth + 1)?;
                }
            }
            ttype::MAP => {
                let size = self.read_varint()? as usize;
                if size > 0 {
                    let kinds = self.read_u8()?;
                    for _ in 0..size {
                        self.skip_with_depth(kinds >> 4, depth + 1)?;
                        self.skip_with_depth(kinds & 0x0F, depth + 1)?;
                    }
                }
            }
            ttype::STRUCT => {
                self.read_struct_begin();
                while let Some((field_type, _)) = self.read_field_begin()? {
                    self.skip_with_depth(field_type, depth + 1)?;
                }
                self.read_struct_end();
            }
            other => return Err(thrift_err(format!("unknown type code {}", other))),
        }
        Ok(())
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_field_headers() {
        let mut w = CompactWriter::new();
        w.write_struct_begin();
        w.write_i32_field(1, -3);
        w.write_i64_field(20, 1 << 40);
        w.write_bool_field(21, true);
        w.write_struct_end();
        let bytes = w.into_bytes();

        // Field 1: delta 1, I32, zigzag(-3) = 5.
        assert_eq!(&bytes[..2], &[0x15, 0x05]);
        // Field 20: delta 19 is too large, so the id follows the type byte.
        assert_eq!(&bytes[2..4], &[ttype::I64, 40]);

        let mut r = CompactReader::new(&bytes);
        r.read_struct_begin();
        assert_eq!(r.read_field_begin().unwrap(), Some((ttype::I32, 1)));
        assert_eq!(r.read_i32().unwrap(), -3);
        assert_eq!(r.read_field_begin().unwrap(), Some((ttype::I64, 20)));
        assert_eq!(r.read_i64().unwrap(), 1 << 40);
        assert_eq!(r.read_field_begin().unwrap(), Some((ttype::BOOL_TRUE, 21)));
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_field_begin().unwrap(), None);
        r.read_struct_end();
        assert_eq!(r.position(), bytes.len());
    }

    #[test]
    fn test_long_list_header() {
        let mut w = CompactWriter::new();
        w.write_list_begin(ttype::I32, 20);
        for i in 0..20 {
            w.write_i32(i);
        }
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 0xF0 | ttype::I32);

        let mut r = CompactReader::new(&bytes);
        assert_eq!(r.read_list_begin().unwrap(), (ttype::I32, 20));
        let values: Vec<i32> = (0..20).map(|_| r.read_i32().unwrap()).collect();
        assert_eq!(values, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_skip_nested_struct() {
        let mut w = CompactWriter::new();
        w.write_struct_begin();
        w.write_struct_field_begin(1);
        w.write_string_field(1, "ignored");
        w.write_list_field_begin(2, ttype::BINARY, 2);
        w.write_binary(b"a");
        w.write_binary(b"b");
        w.write_struct_end();
        w.write_i32_field(2, 7);
        w.write_struct_end();
        let bytes = w.into_bytes();

        let mut r = CompactReader::new(&bytes);
        r.read_struct_begin();
        let (kind, id) = r.read_field_begin().unwrap().unwrap();
        assert_eq!(id, 1);
        r.skip(kind).unwrap();
        // The outer field id sequence resumes after the nested struct.
        assert_eq!(r.read_field_begin().unwrap(), Some((ttype::I32, 2)));
        assert_eq!(r.read_i32().unwrap(), 7);
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let mut r = CompactReader::new(&[0x18, 0x0A, b'a']);
        r.read_struct_begin();
        let (kind, _) = r.read_field_begin().unwrap().unwrap();
        assert_eq!(kind, ttype::BINARY);
        assert!(matches!(r.read_binary(), Err(ColumnarError::Thrift(_))));
    }
}
