//! Tests for the `column_store` module.

#[cfg(test)]
mod tests {
    use crate::column_store::ColumnStore;
    use crate::error::Error;
    use std::mem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Mixed = (i32, String, i16, f64);

    fn mixed_row(i: i32) -> (i32, String, i16, f64) {
        (i, format!("s{i}"), -(i as i16), f64::from(i))
    }

    // =========================================================================
    // Construction & growth
    // =========================================================================

    #[test]
    fn test_new_store_is_empty() {
        // Arrange
        let store: ColumnStore<Mixed> = ColumnStore::new();

        // Assert
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert_eq!(store.capacity(), 0);
        assert!(store.col::<0>().is_empty());
        assert!(store.col::<1>().is_empty());
    }

    #[test]
    fn test_first_push_allocates_sixteen_slots() {
        // Arrange
        let mut store: ColumnStore<Mixed> = ColumnStore::new();

        // Act
        store.push(mixed_row(0)).unwrap();

        // Assert
        assert_eq!(store.len(), 1);
        assert_eq!(store.capacity(), 16);
    }

    #[test]
    fn test_growth_boundary_sixteen_to_thirty_two() {
        let mut store: ColumnStore<Mixed> = ColumnStore::new();

        // 16 pushes fit in the first block.
        for i in 0..16 {
            store.push(mixed_row(i)).unwrap();
        }
        assert_eq!(store.len(), 16);
        assert_eq!(store.capacity(), 16);

        // The 17th doubles it.
        store.push(mixed_row(16)).unwrap();
        assert_eq!(store.len(), 17);
        assert_eq!(store.capacity(), 32);

        // All prior rows survived the move.
        for i in 0..17 {
            assert_eq!(store.at::<0>(i as usize), &i);
            assert_eq!(store.at::<1>(i as usize), &format!("s{i}"));
            assert_eq!(store.at::<2>(i as usize), &-(i as i16));
            assert_eq!(store.at::<3>(i as usize), &f64::from(i));
        }
    }

    #[test]
    fn test_columns_are_contiguous() {
        // Arrange
        let mut store: ColumnStore<Mixed> = ColumnStore::new();
        for i in 0..16 {
            store.push(mixed_row(i)).unwrap();
        }
        let cap = store.capacity();

        // Act
        let ints = store.col::<0>().as_ptr() as usize;
        let strings = store.col::<1>().as_ptr() as usize;
        let shorts = store.col::<2>().as_ptr() as usize;
        let doubles = store.col::<3>().as_ptr() as usize;

        // Assert: each sub-array starts where the previous one ends.
        assert_eq!(strings, ints + mem::size_of::<i32>() * cap);
        assert_eq!(shorts, strings + mem::size_of::<String>() * cap);
        assert_eq!(doubles, shorts + mem::size_of::<i16>() * cap);
    }

    #[test]
    fn test_capacity_quantization() {
        // Arrange
        let mut store: ColumnStore<(u64, u64)> = ColumnStore::new();

        // Act
        store.reserve(1010).unwrap();

        // Assert
        assert_eq!(store.capacity(), 1024);

        // A smaller reserve is a no-op.
        store.reserve(10).unwrap();
        assert_eq!(store.capacity(), 1024);

        for i in 0..40u64 {
            store.push((i, i)).unwrap();
        }
        assert_eq!(store.capacity() % 16, 0);
        assert!(store.len() <= store.capacity());
    }

    #[test]
    fn test_with_len_and_with_fill() {
        // Act
        let defaulted: ColumnStore<(i32, f64)> = ColumnStore::with_len(5).unwrap();
        let filled = ColumnStore::with_fill(3, (7i32, "x".to_string())).unwrap();

        // Assert
        assert_eq!(defaulted.len(), 5);
        assert_eq!(defaulted.col::<0>(), &[0; 5]);
        assert_eq!(filled.len(), 3);
        assert_eq!(filled.col::<0>(), &[7, 7, 7]);
        assert_eq!(filled.at::<1>(2), "x");
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[test]
    fn test_front_back_and_at() {
        // Arrange
        let mut store: ColumnStore<Mixed> = ColumnStore::new();
        assert_eq!(store.front::<1>(), None);
        assert_eq!(store.back::<1>(), None);

        for i in 0..5 {
            store.push(mixed_row(i)).unwrap();
        }

        // Act & Assert
        assert_eq!(store.front::<1>().unwrap(), "s0");
        assert_eq!(store.back::<1>().unwrap(), "s4");
        assert_eq!(store.at::<3>(2), &2.0);
        *store.at_mut::<0>(2) = 99;
        assert_eq!(store.col::<0>(), &[0, 1, 99, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_at_panics_out_of_range() {
        let mut store: ColumnStore<(i32, i32)> = ColumnStore::new();
        store.push((1, 2)).unwrap();

        let _ = store.at::<0>(1);
    }

    // =========================================================================
    // Row mutation
    // =========================================================================

    #[test]
    fn test_push_default_appends_default_row() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> = ColumnStore::new();
        store.push((5, "five".to_string())).unwrap();

        // Act
        store.push_default().unwrap();

        // Assert
        assert_eq!(store.len(), 2);
        assert_eq!(store.at::<0>(1), &0);
        assert_eq!(store.at::<1>(1), "");
    }

    #[test]
    fn test_insert_shifts_preserving_order() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> = ColumnStore::new();
        for i in [0, 1, 3, 4] {
            store.push((i, format!("s{i}"))).unwrap();
        }

        // Act
        store.insert(2, (2, "s2".to_string())).unwrap();

        // Assert
        assert_eq!(store.col::<0>(), &[0, 1, 2, 3, 4]);
        assert_eq!(store.at::<1>(2), "s2");
    }

    #[test]
    fn test_insert_rejects_out_of_range_position() {
        // Arrange
        let mut store: ColumnStore<(i32, i32)> = ColumnStore::new();
        store.push((1, 1)).unwrap();

        // Act
        let err = store.insert(2, (9, 9)).unwrap_err();

        // Assert
        assert_eq!(err, Error::OutOfBounds { index: 2, len: 1 });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_at_end_appends() {
        let mut store: ColumnStore<(i32, i32)> = ColumnStore::new();
        store.insert(0, (1, 10)).unwrap();
        store.insert(1, (2, 20)).unwrap();

        assert_eq!(store.col::<0>(), &[1, 2]);
    }

    #[test]
    fn test_pop_returns_rows_in_reverse() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> = ColumnStore::new();
        store.push((1, "a".into())).unwrap();
        store.push((2, "b".into())).unwrap();

        // Act & Assert
        assert_eq!(store.pop(), Some((2, "b".to_string())));
        assert_eq!(store.pop(), Some((1, "a".to_string())));
        assert_eq!(store.pop(), None);
    }

    #[test]
    fn test_erase_swap_is_unordered() {
        // Arrange
        let mut store: ColumnStore<(i32, i32)> = ColumnStore::new();
        for i in 0..4 {
            store.push((i, i * 10)).unwrap();
        }

        // Act
        let removed = store.erase_swap(1);

        // Assert
        assert_eq!(removed, Some((1, 10)));
        // The previously-last row moved into the freed position.
        assert_eq!(store.col::<0>(), &[0, 3, 2]);
        assert_eq!(store.erase_swap(7), None);
    }

    #[test]
    fn test_erase_shift_preserves_order() {
        // Arrange
        let mut store: ColumnStore<(i32, i32)> = ColumnStore::new();
        for i in 0..5 {
            store.push((i, i * 10)).unwrap();
        }

        // Act
        let removed = store.erase_shift(1);

        // Assert
        assert_eq!(removed, Some((1, 10)));
        assert_eq!(store.col::<0>(), &[0, 2, 3, 4]);
        assert_eq!(store.col::<1>(), &[0, 20, 30, 40]);
        assert_eq!(store.erase_shift(9), None);
    }

    #[test]
    fn test_swap_entries_exchanges_whole_rows() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> = ColumnStore::new();
        store.push((1, "one".into())).unwrap();
        store.push((2, "two".into())).unwrap();

        // Act
        store.swap_entries(0, 1);

        // Assert
        assert_eq!(store.col::<0>(), &[2, 1]);
        assert_eq!(store.at::<1>(0), "two");

        // Out of range is a documented no-op.
        store.swap_entries(0, 5);
        assert_eq!(store.col::<0>(), &[2, 1]);
    }

    #[test]
    fn test_resize_grows_and_shrinks() {
        let mut store: ColumnStore<(i32, f64)> = ColumnStore::new();
        store.push((7, 7.0)).unwrap();

        store.resize(4).unwrap();
        assert_eq!(store.col::<0>(), &[7, 0, 0, 0]);

        store.resize(2).unwrap();
        assert_eq!(store.col::<0>(), &[7, 0]);

        store.resize_fill(4, (9, 9.0)).unwrap();
        assert_eq!(store.col::<0>(), &[7, 0, 9, 9]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> = ColumnStore::new();
        for i in 0..20 {
            store.push((i, i.to_string())).unwrap();
        }
        let cap = store.capacity();

        // Act
        store.clear();

        // Assert
        assert!(store.is_empty());
        assert_eq!(store.capacity(), cap);
    }

    #[test]
    fn test_shrink_to_fit_releases_empty_store() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> = ColumnStore::new();
        for i in 0..20 {
            store.push((i, i.to_string())).unwrap();
        }
        assert_eq!(store.capacity(), 32);

        // Act & Assert: 17 rows still need both blocks of 16.
        store.resize(17).unwrap();
        store.shrink_to_fit().unwrap();
        assert_eq!(store.capacity(), 32);

        store.resize(3).unwrap();
        store.shrink_to_fit().unwrap();
        assert_eq!(store.capacity(), 16);
        assert_eq!(store.col::<0>(), &[0, 1, 2]);

        store.clear();
        store.shrink_to_fit().unwrap();
        assert_eq!(store.capacity(), 0);
        assert!(store.col::<1>().is_empty());
    }

    // =========================================================================
    // Binary search & sort
    // =========================================================================

    #[test]
    fn test_sorted_range_bracketing() {
        // Arrange: 0..21 with a string payload per row, key column pre-sorted.
        let mut store: ColumnStore<(i32, String)> =
            (0..21).map(|i| (i, format!("s{i}"))).collect();

        store.reserve(1010).unwrap();
        assert_eq!(store.capacity(), 1024);
        assert_eq!(store.len(), 21);

        // Act: pile three more 10s onto the run.
        let at = store.lower_bound::<0>(&10);
        assert_eq!(store.at::<0>(at), &10);

        store.insert(at, (10, "10".to_string())).unwrap();
        store.insert(at, (10, "TEN".to_string())).unwrap();
        store.insert(at, (10, "TEEEEEEEN".to_string())).unwrap();

        // Assert: the bounds bracket exactly the rows whose key is 10.
        let begin = store.lower_bound::<0>(&10);
        let end = store.upper_bound::<0>(&10);
        assert_eq!(end - begin, 4);
        assert_eq!(store.at::<1>(begin), "TEEEEEEEN");
        assert_eq!(store.at::<1>(begin + 1), "TEN");
        assert_eq!(store.at::<1>(begin + 2), "10");
        assert_eq!(store.at::<1>(begin + 3), "s10");

        // Beyond every key: both bounds land at len().
        assert_eq!(store.lower_bound::<0>(&42), store.len());
        assert_eq!(store.upper_bound::<0>(&42), store.len());

        assert_eq!(store.front::<1>().unwrap(), "s0");
        assert_eq!(store.back::<1>().unwrap(), "s20");

        // Remove the three extras and the tail; the original run remains.
        let at = store.lower_bound::<0>(&10);
        store.erase_shift(at);
        store.erase_shift(at);
        store.erase_shift(at);
        store.pop();
        store.pop();
        for i in 0..store.len() {
            assert_eq!(store.at::<0>(i), &(i as i32));
            assert_eq!(store.at::<1>(i), &format!("s{i}"));
        }
    }

    #[test]
    fn test_lower_bound_row_uses_designated_column_only() {
        // Arrange
        let store: ColumnStore<(i32, i32)> = (0..10).map(|i| (i * 2, -1)).collect();

        // Act & Assert: the payload of the probe row is ignored.
        assert_eq!(store.lower_bound_row::<0>(&(6, 12345)), 3);
        assert_eq!(store.lower_bound_row::<0>(&(7, 0)), 4);
    }

    #[test]
    fn test_bounds_on_empty_store() {
        let store: ColumnStore<(i32, i32)> = ColumnStore::new();
        assert_eq!(store.lower_bound::<0>(&5), 0);
        assert_eq!(store.upper_bound::<0>(&5), 0);
    }

    #[test]
    fn test_sort_orders_whole_rows() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> = [3, 1, 4, 1, 5, 9, 2, 6]
            .into_iter()
            .map(|k| (k, format!("s{k}")))
            .collect();

        // Act
        let swaps = store.sort::<0>();

        // Assert
        assert!(swaps > 0);
        assert_eq!(store.col::<0>(), &[1, 1, 2, 3, 4, 5, 6, 9]);
        // Payloads traveled with their keys.
        for i in 0..store.len() {
            assert_eq!(store.at::<1>(i), &format!("s{}", store.at::<0>(i)));
        }
    }

    #[test]
    fn test_sort_swap_count_is_exact() {
        // An already-sorted run of n distinct keys partitions with a full
        // sweep of self-swaps at every level: n + (n-1) + ... + 2 swaps.
        let mut store: ColumnStore<(i32, i32)> = (0..5).map(|i| (i, i)).collect();

        assert_eq!(store.sort::<0>(), 14);
        assert_eq!(store.col::<0>(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sort_trivial_cases() {
        let mut empty: ColumnStore<(i32, i32)> = ColumnStore::new();
        assert_eq!(empty.sort::<0>(), 0);

        let mut single: ColumnStore<(i32, i32)> = [(9, 9)].into_iter().collect();
        assert_eq!(single.sort::<0>(), 0);
    }

    #[test]
    fn test_sort_by_payload_column() {
        // Arrange
        let mut store: ColumnStore<(i32, i32)> =
            [(0, 30), (1, 10), (2, 20)].into_iter().collect();

        // Act
        store.sort::<1>();

        // Assert
        assert_eq!(store.col::<1>(), &[10, 20, 30]);
        assert_eq!(store.col::<0>(), &[1, 2, 0]);
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn test_serialize_round_trip() {
        // Arrange
        let mut store: ColumnStore<(u64, f64)> = ColumnStore::new();
        for i in 0..21u64 {
            store.push((i, f64::from(u32::try_from(i).unwrap()) * 0.5)).unwrap();
        }
        let n = store.len();

        // Act
        let bytes = store.serialize().unwrap().to_vec();

        // Assert: shrunk to the smallest quantized capacity before exposing
        // bytes.
        assert_eq!(store.capacity(), 32);
        assert_eq!(
            bytes.len(),
            (mem::size_of::<u64>() + mem::size_of::<f64>()) * store.capacity()
        );

        let mut other: ColumnStore<(u64, f64)> = ColumnStore::new();
        other.deserialize(n).unwrap().copy_from_slice(&bytes);

        assert_eq!(other.len(), n);
        assert_eq!(other.col::<0>(), store.col::<0>());
        assert_eq!(other.col::<1>(), store.col::<1>());
    }

    #[test]
    fn test_serialize_empty_store() {
        let mut store: ColumnStore<(u64, u32)> = ColumnStore::new();
        let bytes = store.serialize().unwrap().to_vec();
        assert!(bytes.is_empty());

        let mut other: ColumnStore<(u64, u32)> = ColumnStore::new();
        let buf = other.deserialize(0).unwrap();
        assert!(buf.is_empty());
        assert!(other.is_empty());
    }

    #[test]
    fn test_deserialize_discards_previous_contents() {
        // Arrange
        let mut source: ColumnStore<(u32, u32)> = (0..5u32).map(|i| (i, i + 100)).collect();
        let bytes = source.serialize().unwrap().to_vec();
        let mut target: ColumnStore<(u32, u32)> = (0..40u32).map(|i| (i, i)).collect();

        // Act
        target.deserialize(5).unwrap().copy_from_slice(&bytes);

        // Assert
        assert_eq!(target.len(), 5);
        assert_eq!(target.capacity(), 16);
        assert_eq!(target.col::<1>(), &[100, 101, 102, 103, 104]);
    }

    // =========================================================================
    // Ownership: drops, clones, iterators
    // =========================================================================

    #[derive(Clone, Debug)]
    struct DropTally(Arc<AtomicUsize>);

    impl Drop for DropTally {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_every_row_drops_exactly_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let mut store: ColumnStore<(i32, DropTally)> = ColumnStore::new();
            for i in 0..20 {
                store.push((i, DropTally(Arc::clone(&drops)))).unwrap();
            }
            // Growth must move values, not duplicate them.
            assert_eq!(drops.load(Ordering::Relaxed), 0);

            drop(store.pop());
            assert_eq!(drops.load(Ordering::Relaxed), 1);

            drop(store.erase_swap(0));
            drop(store.erase_shift(3));
            assert_eq!(drops.load(Ordering::Relaxed), 3);

            store.resize_fill(5, (0, DropTally(Arc::clone(&drops)))).unwrap();
            // 17 live rows cut down to 5, plus the fill template itself.
            assert_eq!(drops.load(Ordering::Relaxed), 3 + 12 + 1);

            store.clear();
            assert_eq!(drops.load(Ordering::Relaxed), 3 + 12 + 1 + 5);
        }
        // Nothing double-dropped when the store itself went away.
        assert_eq!(drops.load(Ordering::Relaxed), 21);
    }

    #[test]
    fn test_clone_is_deep() {
        // Arrange
        let mut store: ColumnStore<(i32, String)> =
            (0..10).map(|i| (i, format!("s{i}"))).collect();

        // Act
        let copy = store.clone();
        store.erase_swap(0);
        *store.at_mut::<0>(0) = 999;

        // Assert: the copy is untouched by edits to the original.
        assert_eq!(copy.len(), 10);
        for i in 0..10 {
            assert_eq!(copy.at::<0>(i), &(i as i32));
            assert_eq!(copy.at::<1>(i), &format!("s{i}"));
        }
    }

    #[test]
    fn test_from_iterator_and_extend() {
        let mut store: ColumnStore<(i32, i32)> = (0..3).map(|i| (i, i)).collect();
        store.extend((3..6).map(|i| (i, i)));

        assert_eq!(store.col::<0>(), &[0, 1, 2, 3, 4, 5]);
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Push(i64),
            Insert(usize, i64),
            EraseSwap(usize),
            EraseShift(usize),
            Pop,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<i64>().prop_map(Op::Push),
                (any::<usize>(), any::<i64>()).prop_map(|(at, k)| Op::Insert(at, k)),
                any::<usize>().prop_map(Op::EraseSwap),
                any::<usize>().prop_map(Op::EraseShift),
                Just(Op::Pop),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Property: the store behaves like a Vec of rows under random
            /// edit programs, and the capacity invariants always hold.
            #[test]
            fn prop_store_matches_vec_model(
                ops in proptest::collection::vec(op_strategy(), 0..200)
            ) {
                let mut store: ColumnStore<(i64, i64)> = ColumnStore::new();
                let mut model: Vec<(i64, i64)> = Vec::new();

                for op in ops {
                    match op {
                        Op::Push(k) => {
                            store.push((k, !k)).unwrap();
                            model.push((k, !k));
                        }
                        Op::Insert(at, k) => {
                            let at = at % (model.len() + 1);
                            store.insert(at, (k, !k)).unwrap();
                            model.insert(at, (k, !k));
                        }
                        Op::EraseSwap(at) if !model.is_empty() => {
                            let at = at % model.len();
                            prop_assert_eq!(store.erase_swap(at), Some(model.swap_remove(at)));
                        }
                        Op::EraseShift(at) if !model.is_empty() => {
                            let at = at % model.len();
                            prop_assert_eq!(store.erase_shift(at), Some(model.remove(at)));
                        }
                        Op::Pop => prop_assert_eq!(store.pop(), model.pop()),
                        Op::EraseSwap(_) | Op::EraseShift(_) => {}
                    }
                    prop_assert_eq!(store.capacity() % 16, 0);
                    prop_assert!(store.len() <= store.capacity() || store.capacity() == 0);
                }

                prop_assert_eq!(store.len(), model.len());
                for (i, row) in model.iter().enumerate() {
                    prop_assert_eq!(store.at::<0>(i), &row.0);
                    prop_assert_eq!(store.at::<1>(i), &row.1);
                }
            }

            /// Property: sorting orders the key column and permutes rows
            /// without losing or inventing any.
            #[test]
            fn prop_sort_is_a_permutation(
                keys in proptest::collection::vec(-100i64..100, 0..80)
            ) {
                let mut store: ColumnStore<(i64, i64)> =
                    keys.iter().map(|&k| (k, k.wrapping_mul(31))).collect();

                store.sort::<0>();

                let sorted_col = store.col::<0>().to_vec();
                let mut expected = keys.clone();
                expected.sort_unstable();
                prop_assert_eq!(sorted_col, expected);
                for i in 0..store.len() {
                    prop_assert_eq!(*store.at::<1>(i), store.at::<0>(i).wrapping_mul(31));
                }
            }
        }
    }
}
