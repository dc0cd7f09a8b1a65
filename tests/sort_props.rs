use proptest::prelude::*;
use tine::prelude::*;

/// Proptest drives every case on one runner thread, so the thread-local
/// runtime is created once and reused across cases.
fn ensure_pool() {
    let _ = tine::init_thread_local_with_config(
        Config::builder().num_threads(4).build().unwrap(),
    );
}

proptest! {
    #[test]
    fn prop_sort_yields_sorted_permutation(mut data in prop::collection::vec(-1000i32..1000, 0..400)) {
        ensure_pool();

        let mut expected = data.clone();
        expected.sort_unstable();

        // Small cutoff so even short inputs take the fork-join path.
        parallel_sort_with_cutoff(&mut data, 8).unwrap();
        prop_assert_eq!(data, expected);
    }

    #[test]
    fn prop_min_matches_sequential_first_occurrence(data in prop::collection::vec(0i32..50, 1..300)) {
        ensure_pool();

        let expected_value = *data.iter().min().unwrap();
        let expected_index = data.iter().position(|&x| x == expected_value).unwrap();

        let min = parallel_min(&data).unwrap();
        prop_assert_eq!(min.value, expected_value);
        prop_assert_eq!(min.index, expected_index);
    }

    #[test]
    fn prop_accumulate_is_complete(n in 0usize..500) {
        ensure_pool();

        let mut result = parallel_accumulate(n, |i| i as u64 * 3).unwrap();
        prop_assert_eq!(result.len(), n);

        result.sort_unstable();
        let expected: Vec<u64> = (0..n as u64).map(|i| i * 3).collect();
        prop_assert_eq!(result, expected);
    }
}
