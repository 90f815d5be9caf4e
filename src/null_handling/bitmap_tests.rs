//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use crate::null_handling::bitmap::*;
    use arrow::array::{Array, BooleanArray, Int32Array};
    use arrow::datatypes::Int32Type;

    #[test]
    fn test_strip_valid_values() {
        let source_array = Int32Array::from(vec![Some(10), None, Some(30)]);
        let valid = strip_valid_values(&source_array);
        assert_eq!(valid, vec![10, 30]);
        assert_eq!(validity_of(&source_array), Some(vec![true, false, true]));
    }

    #[test]
    fn test_validity_is_none_without_nulls() {
        let source_array = Int32Array::from(vec![1, 2, 3]);
        assert_eq!(validity_of(&source_array), None);
    }

    #[test]
    fn test_reapply_validity_with_nulls() {
        let dense: Vec<i32> = vec![10, 30, 50];
        let validity = [true, false, true, false, true];

        let reconstructed = reapply_validity::<Int32Type>(dense, Some(&validity), 5).unwrap();

        let expected = Int32Array::from(vec![Some(10), None, Some(30), None, Some(50)]);
        assert_eq!(reconstructed, expected);
    }

    #[test]
    fn test_reapply_validity_no_nulls() {
        let reconstructed = reapply_validity::<Int32Type>(vec![10, 20, 30], None, 3).unwrap();
        assert_eq!(reconstructed, Int32Array::from(vec![10, 20, 30]));
        assert_eq!(reconstructed.null_count(), 0);
    }

    #[test]
    fn test_reapply_validity_all_null() {
        let reconstructed = reapply_validity::<Int32Type>(Vec::new(), Some(&[false; 4]), 4).unwrap();
        assert_eq!(reconstructed.len(), 4);
        assert_eq!(reconstructed.null_count(), 4);
    }

    #[test]
    fn test_count_mismatch_is_an_error() {
        assert!(reapply_validity::<Int32Type>(vec![1], Some(&[true, true]), 2).is_err());
        assert!(reapply_validity::<Int32Type>(vec![1, 2, 3], Some(&[true, true]), 2).is_err());
        assert!(reapply_validity::<Int32Type>(vec![1, 2], None, 3).is_err());
    }

    #[test]
    fn test_bool_strip_and_reapply() {
        let source = BooleanArray::from(vec![Some(true), None, Some(false)]);
        let dense = strip_valid_bools(&source);
        let validity = validity_of(&source);
        assert_eq!(dense, vec![true, false]);

        let rebuilt = reapply_validity_bools(dense, validity.as_deref(), 3).unwrap();
        assert_eq!(rebuilt, source);
    }
}
