//! This module contains the kernel for dictionary encoding.
//!
//! A column chunk in dictionary mode stores each distinct value once, in
//! first-seen order, in a dictionary page (PLAIN layout). Data pages then carry
//! only indices into that dictionary:
//!
//! 1.  **Bit Width (`u8`)**: the smallest width that covers `dictionary_len - 1`.
//! 2.  **Indices**: an RLE/bit-packing hybrid stream at that width.
//!
//! The encoder enforces a byte budget on the dictionary. When admitting a new
//! entry would exceed it, `put` returns `DictionaryOverflow` without inserting,
//! and the column writer falls back to PLAIN for the rest of the chunk.

use hashbrown::HashMap;

use crate::error::ColumnarError;
use crate::kernels::rle;
use crate::traits::ParquetNative;

//==================================================================================
// 1. Encoder
//==================================================================================

#[derive(Debug)]
pub struct DictEncoder<T: ParquetNative> {
    lookup: HashMap<T::DictKey, u32>,
    entries: Vec<T>,
    plain_bytes: usize,
    byte_limit: usize,
}

impl<T: ParquetNative> DictEncoder<T> {
    pub fn new(byte_limit: usize) -> Self {
        Self {
            lookup: HashMap::new(),
            entries: Vec::new(),
            plain_bytes: 0,
            byte_limit,
        }
    }

    /// Returns the index of `value`, inserting it if it is new.
    pub fn put(&mut self, value: &T) -> Result<u32, ColumnarError> {
        let key = value.dict_key();
        if let Some(&index) = self.lookup.get(&key) {
            return Ok(index);
        }

        let size = value.plain_size();
        if self.plain_bytes + size > self.byte_limit {
            return Err(ColumnarError::DictionaryOverflow);
        }
        let index = u32::try_from(self.entries.len())
            .map_err(|_| ColumnarError::DictionaryOverflow)?;
        self.lookup.insert(key, index);
        self.entries.push(value.clone());
        self.plain_bytes += size;
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the dictionary page body before compression.
    pub fn plain_bytes(&self) -> usize {
        self.plain_bytes
    }

    /// Index width for the current number of entries.
    pub fn bit_width(&self) -> u8 {
        rle::bit_width_for(self.entries.len().saturating_sub(1) as u64)
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// PLAIN-encodes the dictionary for its page.
    pub fn write_dictionary_page(&self, type_length: usize, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
        T::plain_encode(&self.entries, type_length, out)
    }
}

//==================================================================================
// 2. Index Stream Codec
//==================================================================================

/// Writes the bit-width byte followed by the hybrid index stream.
pub fn encode_indices(indices: &[u32], bit_width: u8, out: &mut Vec<u8>) -> Result<(), ColumnarError> {
    out.push(bit_width);
    rle::encode(indices, bit_width, out)
}

/// Reads `num_values` indices from a dictionary-encoded data page.
pub fn decode_indices(bytes: &[u8], num_values: usize) -> Result<Vec<u32>, ColumnarError> {
    if num_values == 0 {
        return Ok(Vec::new());
    }
    let (&bit_width, stream) = bytes
        .split_first()
        .ok_or_else(|| ColumnarError::DictionaryError("missing index bit width".to_string()))?;
    let (indices, _) = rle::decode(stream, bit_width, num_values)?;
    Ok(indices)
}

/// Resolves indices against a materialized dictionary.
pub fn materialize<T: Clone>(dictionary: &[T], indices: &[u32]) -> Result<Vec<T>, ColumnarError> {
    indices
        .iter()
        .map(|&index| {
            dictionary.get(index as usize).cloned().ok_or_else(|| {
                ColumnarError::DictionaryError(format!(
                    "Invalid dictionary index: {} (dictionary size is {})",
                    index,
                    dictionary.len()
                ))
            })
        })
        .collect()
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ByteArray;

    #[test]
    fn test_dictionary_roundtrip_i32() {
        let original: Vec<i32> = vec![100, 200, 100, 300, 200, 200, 100];
        let mut dict = DictEncoder::<i32>::new(1024);
        let indices: Vec<u32> = original.iter().map(|v| dict.put(v).unwrap()).collect();

        assert_eq!(dict.entries(), &[100, 200, 300]);
        assert_eq!(indices, vec![0, 1, 0, 2, 1, 1, 0]);
        assert_eq!(dict.bit_width(), 2);

        let mut page = Vec::new();
        encode_indices(&indices, dict.bit_width(), &mut page).unwrap();
        let decoded = decode_indices(&page, indices.len()).unwrap();
        assert_eq!(materialize(dict.entries(), &decoded).unwrap(), original);
    }

    #[test]
    fn test_single_entry_uses_zero_bit_width() {
        let mut dict = DictEncoder::<i64>::new(1024);
        for _ in 0..10 {
            dict.put(&7).unwrap();
        }
        assert_eq!(dict.bit_width(), 0);

        let mut page = Vec::new();
        encode_indices(&[0; 10], 0, &mut page).unwrap();
        assert_eq!(page[0], 0);
        assert_eq!(decode_indices(&page, 10).unwrap(), vec![0; 10]);
    }

    #[test]
    fn test_overflow_rejects_without_inserting() {
        // Each i32 costs 4 bytes; a 10-byte budget admits two entries.
        let mut dict = DictEncoder::<i32>::new(10);
        assert_eq!(dict.put(&1).unwrap(), 0);
        assert_eq!(dict.put(&2).unwrap(), 1);
        assert!(matches!(dict.put(&3), Err(ColumnarError::DictionaryOverflow)));
        assert_eq!(dict.len(), 2);
        // Existing entries are still served after an overflow.
        assert_eq!(dict.put(&1).unwrap(), 0);
    }

    #[test]
    fn test_byte_array_dictionary_page() {
        let mut dict = DictEncoder::<ByteArray>::new(1024);
        dict.put(&ByteArray::from("a")).unwrap();
        dict.put(&ByteArray::from("bc")).unwrap();
        assert_eq!(dict.plain_bytes(), 5 + 6);

        let mut page = Vec::new();
        dict.write_dictionary_page(0, &mut page).unwrap();
        assert_eq!(page, vec![1, 0, 0, 0, b'a', 2, 0, 0, 0, b'b', b'c']);
    }

    #[test]
    fn test_invalid_index_errors() {
        let result = materialize(&[10i32], &[0, 1]);
        assert!(matches!(result, Err(ColumnarError::DictionaryError(_))));
        assert!(decode_indices(&[], 3).is_err());
    }
}
