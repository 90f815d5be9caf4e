//! Incremental min/max/null-count statistics for one column chunk.

use std::cmp::Ordering;

use crate::metadata::Statistics;
use crate::traits::ParquetNative;
use crate::types::SortOrder;

#[derive(Debug)]
pub struct StatisticsAccumulator<T: ParquetNative> {
    order: SortOrder,
    min_max_enabled: bool,
    min: Option<T>,
    max: Option<T>,
    null_count: u64,
}

impl<T: ParquetNative> StatisticsAccumulator<T> {
    pub fn new(order: SortOrder, min_max_enabled: bool) -> Self {
        Self {
            order,
            min_max_enabled,
            min: None,
            max: None,
            null_count: 0,
        }
    }

    /// Folds dense (non-null) values into min/max. NaN never becomes a bound.
    pub fn update(&mut self, values: &[T]) {
        if !self.min_max_enabled {
            return;
        }
        for value in values.iter().filter(|v| !v.is_nan()) {
            if self
                .min
                .as_ref()
                .map_or(true, |min| value.compare(min, self.order) == Ordering::Less)
            {
                self.min = Some(value.clone());
            }
            if self
                .max
                .as_ref()
                .map_or(true, |max| value.compare(max, self.order) == Ordering::Greater)
            {
                self.max = Some(value.clone());
            }
        }
    }

    pub fn add_nulls(&mut self, count: usize) {
        self.null_count += count as u64;
    }

    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    pub fn to_thrift(&self) -> Statistics {
        Statistics {
            null_count: Some(self.null_count as i64),
            min_value: self.min.as_ref().map(ParquetNative::stat_bytes),
            max_value: self.max.as_ref().map(ParquetNative::stat_bytes),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ByteArray;

    #[test]
    fn test_signed_min_max() {
        let mut stats = StatisticsAccumulator::<i32>::new(SortOrder::Signed, true);
        stats.update(&[5, -3, 12, 0]);
        stats.add_nulls(2);
        let thrift = stats.to_thrift();
        assert_eq!(thrift.min_value, Some((-3i32).to_le_bytes().to_vec()));
        assert_eq!(thrift.max_value, Some(12i32.to_le_bytes().to_vec()));
        assert_eq!(thrift.null_count, Some(2));
    }

    #[test]
    fn test_unsigned_order_puts_negative_last() {
        // A UINT_32 column stores 4_000_000_000 as a negative i32.
        let big = 4_000_000_000u32 as i32;
        let mut stats = StatisticsAccumulator::<i32>::new(SortOrder::Unsigned, true);
        stats.update(&[1, big, 7]);
        let thrift = stats.to_thrift();
        assert_eq!(thrift.min_value, Some(1i32.to_le_bytes().to_vec()));
        assert_eq!(thrift.max_value, Some(big.to_le_bytes().to_vec()));
    }

    #[test]
    fn test_nan_is_ignored() {
        let mut stats = StatisticsAccumulator::<f64>::new(SortOrder::Signed, true);
        stats.update(&[f64::NAN, 2.5, -1.0, f64::NAN]);
        let thrift = stats.to_thrift();
        assert_eq!(thrift.min_value, Some((-1.0f64).to_le_bytes().to_vec()));
        assert_eq!(thrift.max_value, Some(2.5f64.to_le_bytes().to_vec()));

        let mut only_nan = StatisticsAccumulator::<f32>::new(SortOrder::Signed, true);
        only_nan.update(&[f32::NAN]);
        assert_eq!(only_nan.to_thrift().min_value, None);
    }

    #[test]
    fn test_byte_arrays_compare_lexicographically() {
        let mut stats = StatisticsAccumulator::<ByteArray>::new(SortOrder::Unsigned, true);
        stats.update(&[ByteArray::from("pear"), ByteArray::from("apple"), ByteArray::from("zoo")]);
        let thrift = stats.to_thrift();
        assert_eq!(thrift.min_value, Some(b"apple".to_vec()));
        assert_eq!(thrift.max_value, Some(b"zoo".to_vec()));
    }

    #[test]
    fn test_disabled_keeps_only_null_count() {
        let mut stats = StatisticsAccumulator::<i64>::new(SortOrder::Signed, false);
        stats.update(&[1, 2, 3]);
        stats.add_nulls(1);
        let thrift = stats.to_thrift();
        assert_eq!(thrift.min_value, None);
        assert_eq!(thrift.max_value, None);
        assert_eq!(thrift.null_count, Some(1));
    }
}
