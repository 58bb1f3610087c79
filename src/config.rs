// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Process-wide configuration and the lazily-created global worker pool.
//!
//! The configuration record and the pool handle are the only shared mutable
//! state in the engine. Reads take a single snapshot under the lock; writes
//! are rare and also gate pool replacement.

use crate::macros::{log_debug, log_warn};
use crate::pool::{CpuPinning, ThreadCount, WorkerPool};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};

/// Environment variable read on first use to size the worker pool.
pub const ENV_NUM_THREADS: &str = "FASTITER_NUM_THREADS";

/// Default length below which a bridge stops splitting and processes a chunk
/// sequentially.
pub const DEFAULT_MIN_SPLIT_SIZE: usize = 10_000;

/// Snapshot of the engine configuration, copied once per bridge invocation.
#[derive(Clone, Copy)]
pub(crate) struct Config {
    pub num_threads: NonZeroUsize,
    pub min_split_size: NonZeroUsize,
    pub max_split_depth: usize,
    pub cpu_pinning: CpuPinning,
}

struct GlobalState {
    config: Config,
    /// Whether `set_max_split_depth()` was called; if not, the depth follows
    /// `num_threads` via [`default_max_split_depth()`].
    depth_overridden: bool,
    pool: Option<Arc<WorkerPool>>,
}

impl GlobalState {
    fn from_env() -> Self {
        let num_threads = num_threads_from_env().unwrap_or_else(|| {
            std::thread::available_parallelism()
                .expect("Getting the available parallelism failed")
        });
        GlobalState {
            config: Config {
                num_threads,
                min_split_size: NonZeroUsize::try_from(DEFAULT_MIN_SPLIT_SIZE).unwrap(),
                max_split_depth: default_max_split_depth(num_threads),
                cpu_pinning: CpuPinning::No,
            },
            depth_overridden: false,
            pool: None,
        }
    }
}

static GLOBAL: OnceLock<Mutex<GlobalState>> = OnceLock::new();

fn global() -> &'static Mutex<GlobalState> {
    GLOBAL.get_or_init(|| Mutex::new(GlobalState::from_env()))
}

/// Parses [`ENV_NUM_THREADS`], ignoring unset, non-numeric and zero values.
fn num_threads_from_env() -> Option<NonZeroUsize> {
    let value = std::env::var(ENV_NUM_THREADS).ok()?;
    match value
        .parse::<usize>()
        .ok()
        .and_then(|n| NonZeroUsize::try_from(n).ok())
    {
        Some(count) => Some(count),
        None => {
            log_warn!("Ignoring invalid {ENV_NUM_THREADS} value {value:?}");
            None
        }
    }
}

/// Maximum split depth derived from the pool size.
///
/// A balanced binary recursion to depth `d` produces up to `2^d` leaf tasks,
/// so the depth tracks `log2(num_threads)`, floored at 2 so that small pools
/// still split, and capped at 4 so that recursive spawns can't exhaust the
/// pool with tasks that block awaiting an unschedulable sibling.
pub(crate) fn default_max_split_depth(num_threads: NonZeroUsize) -> usize {
    (num_threads.get().ilog2() as usize + 1).clamp(2, 4)
}

/// Returns the current configuration together with the global pool, creating
/// the pool on first use.
pub(crate) fn snapshot() -> (Config, Arc<WorkerPool>) {
    let mut state = global().lock().unwrap();
    let config = state.config;
    let pool = state
        .pool
        .get_or_insert_with(|| {
            log_debug!(
                "[config] Creating the global worker pool with {} threads",
                config.num_threads
            );
            Arc::new(WorkerPool::new(config.num_threads, config.cpu_pinning))
        })
        .clone();
    (config, pool)
}

/// Returns the current minimum split size without touching the pool.
pub(crate) fn min_split_size() -> usize {
    global().lock().unwrap().config.min_split_size.get()
}

/// Sets the number of worker threads, replacing the global pool.
///
/// The replacement takes effect for subsequent pipelines; pipelines already
/// running keep the pool they started with, and the old pool is disposed of
/// (draining its queue and joining its workers) once the last of them
/// completes. Unless [`set_max_split_depth()`] was called, the maximum split
/// depth is recomputed from the new thread count.
pub fn set_num_threads(threads: ThreadCount) {
    let num_threads = match threads {
        ThreadCount::AvailableParallelism => std::thread::available_parallelism()
            .expect("Getting the available parallelism failed"),
        ThreadCount::Count(count) => count,
    };
    let old_pool = {
        let mut state = global().lock().unwrap();
        state.config.num_threads = num_threads;
        if !state.depth_overridden {
            state.config.max_split_depth = default_max_split_depth(num_threads);
        }
        state.pool.take()
    };
    // Dropped outside the lock: disposing the pool joins its workers.
    drop(old_pool);
}

/// Returns the configured number of worker threads.
pub fn get_num_threads() -> NonZeroUsize {
    global().lock().unwrap().config.num_threads
}

/// Sets the length below which bridges stop splitting and process chunks
/// sequentially.
pub fn set_min_split_size(size: NonZeroUsize) {
    global().lock().unwrap().config.min_split_size = size;
}

/// Sets the maximum split depth, overriding the thread-count-derived default.
///
/// # Panics
///
/// Panics if `depth < 2`.
pub fn set_max_split_depth(depth: usize) {
    assert!(depth >= 2, "maximum split depth must be at least 2, got {depth}");
    let mut state = global().lock().unwrap();
    state.config.max_split_depth = depth;
    state.depth_overridden = true;
}

/// Sets the CPU pinning policy for worker threads, replacing the global pool.
pub fn set_cpu_pinning(policy: CpuPinning) {
    let old_pool = {
        let mut state = global().lock().unwrap();
        state.config.cpu_pinning = policy;
        state.pool.take()
    };
    drop(old_pool);
}
