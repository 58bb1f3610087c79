// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![doc = include_str!("../README.md")]
#![forbid(missing_docs)]

mod config;
mod macros;
mod pool;
mod util;

pub mod bridge;
pub mod consumer;
pub mod iter;
pub mod producer;

pub use config::{
    get_num_threads, set_cpu_pinning, set_max_split_depth, set_min_split_size, set_num_threads,
    DEFAULT_MIN_SPLIT_SIZE, ENV_NUM_THREADS,
};
pub use iter::{
    from_iterable, par_range, IndexedParallelIterator, IntoParallelIterator,
    IntoParallelRefIterator, ParallelIterator,
};
pub use pool::{CpuPinning, ThreadCount};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static GLOBAL_CONFIG_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes tests that touch the global configuration or pool.
    ///
    /// The lock is tolerant to poisoning: `should_panic` tests unwind while
    /// holding it.
    pub fn global_config_guard() -> MutexGuard<'static, ()> {
        GLOBAL_CONFIG_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::global_config_guard;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Runs a test case with the given pool size, with a small split
    /// threshold so that even modest inputs exercise the parallel paths.
    pub fn with_thread_count(num_threads: usize, test: impl FnOnce()) {
        let _guard = global_config_guard();
        set_num_threads(ThreadCount::try_from(num_threads).unwrap());
        set_min_split_size(NonZeroUsize::try_from(25).unwrap());
        test();
    }

    macro_rules! expand_tests {
        ( $num_threads:expr, ) => {};
        ( $num_threads:expr, $case:ident, $( $others:tt )* ) => {
            #[test]
            fn $case() {
                $crate::test::with_thread_count($num_threads, $crate::test::$case);
            }

            expand_tests!($num_threads, $($others)*);
        };
        ( $num_threads:expr, $case:ident => fail($msg:expr), $( $others:tt )* ) => {
            #[test]
            #[should_panic(expected = $msg)]
            fn $case() {
                $crate::test::with_thread_count($num_threads, $crate::test::$case);
            }

            expand_tests!($num_threads, $($others)*);
        };
    }

    macro_rules! thread_count_tests {
        ( $mod:ident, $num_threads:expr ) => {
            mod $mod {
                expand_tests!(
                    $num_threads,
                    test_sum_range,
                    test_sum_range_step,
                    test_sum_negative_step,
                    test_map_square_collect,
                    test_filter_even_collect,
                    test_reduce_product,
                    test_max_by_key_len,
                    test_any_finds_element,
                    test_all_detects_counterexample,
                    test_empty_pipelines,
                    test_collect_round_trip,
                    test_filter_count,
                    test_min_max,
                    test_tie_break_keeps_left,
                    test_chained_maps,
                    test_fold_chunks,
                    test_map_sum,
                    test_float_sum_is_close,
                    test_for_each_accumulates,
                    test_for_each_ordered_preserves_order,
                    test_shared_slice_source,
                    test_from_iterable_pipelines,
                    test_any_examines_a_bounded_prefix,
                    test_panic_propagates => fail("boom"),
                    test_panic_in_map => fail("square boom"),
                );
            }
        };
    }

    thread_count_tests!(threads_1, 1);
    thread_count_tests!(threads_2, 2);
    thread_count_tests!(threads_4, 4);
    thread_count_tests!(threads_8, 8);
    thread_count_tests!(threads_32, 32);

    fn test_sum_range() {
        let sum: i64 = par_range(0, 1_000_000, 1).sum();
        assert_eq!(sum, 499_999_500_000);
    }

    fn test_sum_range_step() {
        let sum: i64 = par_range(0, 100, 7).sum();
        assert_eq!(sum, 735);
    }

    fn test_sum_negative_step() {
        let sum: i64 = par_range(10, 0, -1).sum();
        assert_eq!(sum, 55);
    }

    fn test_map_square_collect() {
        let squares = par_range(0, 10, 1).map(|x| x * x).collect();
        assert_eq!(squares, vec![0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
    }

    fn test_filter_even_collect() {
        let evens = par_range(0, 20, 1).filter(|x| x % 2 == 0).collect();
        assert_eq!(evens, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]);
    }

    fn test_reduce_product() {
        let factorial = par_range(1, 11, 1).reduce(|| 1, |a, b| a * b);
        assert_eq!(factorial, 3_628_800);
    }

    fn test_max_by_key_len() {
        let words = ["a", "abc", "ab", "abcdef"];
        assert_eq!(words.par_iter().max_by_key(|s| s.len()), Some(&"abcdef"));
    }

    fn test_any_finds_element() {
        assert!(par_range(0, 100, 1).any(|x| x == 73));
        assert!(!par_range(0, 100, 1).any(|x| x == 1000));
    }

    fn test_all_detects_counterexample() {
        assert!(!par_range(0, 100, 1).all(|x| x < 50));
        assert!(par_range(0, 100, 1).all(|x| x < 100));
    }

    fn test_empty_pipelines() {
        let empty: Vec<i64> = Vec::new();
        assert_eq!(empty.par_iter().sum::<i64>(), 0);
        assert_eq!(empty.par_iter().count(), 0);
        assert!(!empty.par_iter().any(|_| true));
        assert!(empty.par_iter().all(|_| false));
        assert_eq!(empty.par_iter().min(), None);
        assert_eq!(empty.par_iter().max(), None);
        assert_eq!(empty.par_iter().map(|&x| x).collect(), Vec::<i64>::new());
        assert_eq!(par_range(0, 0, 1).sum::<i64>(), 0);
        assert_eq!(par_range(5, 6, 1).collect(), vec![5]);
    }

    fn test_collect_round_trip() {
        let xs: Vec<i64> = (0..10_000).collect();
        assert_eq!(xs.clone().into_par_iter().collect(), xs);
        assert_eq!(par_range(0, 1000, 1).collect(), (0..1000).collect::<Vec<_>>());
    }

    fn test_filter_count() {
        assert_eq!(par_range(0, 100, 1).filter(|x| x % 5 == 0).count(), 20);
    }

    fn test_min_max() {
        assert_eq!(par_range(0, 1000, 1).min(), Some(0));
        assert_eq!(par_range(0, 1000, 1).max(), Some(999));
        let words = ["a", "abc", "ab", "abcdef"];
        assert_eq!(words.par_iter().min_by_key(|s| s.len()), Some(&"a"));
    }

    fn test_tie_break_keeps_left() {
        let words = ["aa", "bb", "c"];
        assert_eq!(words.par_iter().max_by_key(|s| s.len()), Some(&"aa"));
        let words = ["aa", "b", "c"];
        assert_eq!(words.par_iter().min_by_key(|s| s.len()), Some(&"b"));
    }

    fn test_chained_maps() {
        let result = par_range(0, 10, 1)
            .map(|x| x + 1)
            .map(|x| x * 2)
            .map(|x| x - 1)
            .collect();
        let expected = (0..10).map(|x| (x + 1) * 2 - 1).collect::<Vec<_>>();
        assert_eq!(result, expected);
    }

    fn test_fold_chunks() {
        let total: i64 = par_range(0, 10_000, 1).fold(|| 0i64, |acc, x| acc + x).sum();
        assert_eq!(total, 49_995_000);
        let max = par_range(0, 10_000, 1)
            .fold(|| i64::MIN, |acc, x| acc.max(x))
            .max();
        assert_eq!(max, Some(9_999));
        let streamed: i64 = from_iterable(0..1000i64).fold(|| 0i64, |acc, x| acc + x).sum();
        assert_eq!(streamed, 499_500);
    }

    fn test_map_sum() {
        let sum: i64 = par_range(0, 100, 1).map(|x| x * x).sum();
        assert_eq!(sum, 328_350);
    }

    fn test_float_sum_is_close() {
        let parallel: f64 = par_range(0, 100_000, 1).map(|x| x as f64 / 3.0).sum();
        let sequential: f64 = (0..100_000).map(|x| x as f64 / 3.0).sum();
        // Parallel association may round differently; exact equality is only
        // guaranteed for integer sums.
        assert!((parallel - sequential).abs() <= 1e-9 * sequential);
    }

    fn test_for_each_accumulates() {
        let total = AtomicI64::new(0);
        par_range(0, 10_000, 1).for_each(|x| {
            total.fetch_add(x, Ordering::Relaxed);
        });
        assert_eq!(total.load(Ordering::Relaxed), 49_995_000);
    }

    fn test_for_each_ordered_preserves_order() {
        let mut seen = Vec::new();
        par_range(0, 1000, 1)
            .map(|x| x * 2)
            .for_each_ordered(|x| seen.push(x));
        assert_eq!(seen, (0..1000).map(|x| x * 2).collect::<Vec<_>>());
    }

    fn test_shared_slice_source() {
        let data: Arc<[i64]> = (0..10_000).collect::<Vec<_>>().into();
        assert_eq!(data.clone().into_par_iter().sum::<i64>(), 49_995_000);
        assert_eq!(data.into_par_iter().max(), Some(9_999));
    }

    fn test_from_iterable_pipelines() {
        assert_eq!(from_iterable(0..10_000i64).sum::<i64>(), 49_995_000);
        assert_eq!(from_iterable(0..10_000i64).count(), 10_000);
        assert!(from_iterable(0..10_000i64).any(|x| x == 9_999));
        assert_eq!(
            from_iterable((0..1000i64).map(|x| x * 3)).filter(|x| x % 2 == 0).count(),
            500
        );
        assert_eq!(from_iterable(std::iter::empty::<i64>()).sum::<i64>(), 0);
    }

    fn test_any_examines_a_bounded_prefix() {
        // Every leaf folder latches on its first element, so the number of
        // examined elements is bounded by the leaf count (at most
        // 2^max_split_depth = 16), not by the input length.
        let calls = AtomicUsize::new(0);
        let result = par_range(0, 1_000_000, 1).any(|_| {
            calls.fetch_add(1, Ordering::Relaxed);
            true
        });
        assert!(result);
        assert!(calls.load(Ordering::Relaxed) <= 16);
    }

    fn test_panic_propagates() {
        par_range(0, 100_000, 1).for_each(|x| {
            if x == 50_000 {
                panic!("boom");
            }
        });
    }

    fn test_panic_in_map() {
        let _: i64 = par_range(0, 100_000, 1)
            .map(|x| {
                if x % 2 == 0 {
                    panic!("square boom");
                }
                x
            })
            .sum();
    }
}
