// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The split/spawn/combine engine connecting producers to consumers.
//!
//! A bridge recursively splits a producer-consumer pair in half, dispatches
//! the right half to the worker pool while running the left half on the
//! current thread, and combines the sibling partials (left before right) as
//! the recursion unwinds. Splitting stops once a chunk is small enough, the
//! depth cap is reached, or the consumer reports that it is full; the chunk
//! is then materialised and folded sequentially.
//!
//! The depth cap bounds the number of concurrently awaited tasks well below
//! the pool size, and a recursing task always runs one half itself, so the
//! pool cannot deadlock on its own spawned children; on top of that, a
//! thread waiting for a sibling executes other queued jobs instead of
//! blocking.

use crate::config;
use crate::consumer::{Consumer, Folder};
use crate::macros::log_warn;
use crate::pool::{StackJob, WorkerPool};
use crate::producer::{Producer, UnindexedProducer};
use crate::util::Fuse;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Once;

/// Per-invocation execution context: a configuration snapshot, the pool, and
/// the fatal-error flag used to cancel outstanding branches.
struct BridgeContext<'a> {
    min_split_size: usize,
    max_split_depth: usize,
    /// False when the pool has a single thread; the bridge then recurses
    /// both halves on the current thread.
    parallel: bool,
    pool: &'a WorkerPool,
    /// Set when any branch panics; remaining branches observe it and return
    /// without doing work.
    fatal: &'a Fuse,
}

fn warn_sequential_once() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        log_warn!("The worker pool has a single thread; pipelines will run sequentially.");
    });
}

/// Runs an indexed producer-consumer pair to completion.
///
/// This is the entry point every indexed pipeline goes through; it is also
/// usable directly with a hand-built producer and consumer.
pub fn bridge<P, C>(producer: P, consumer: C) -> C::Result
where
    P: Producer,
    C: Consumer<P::Item>,
{
    let (config, pool) = config::snapshot();
    let parallel = config.num_threads.get() > 1;
    if !parallel {
        warn_sequential_once();
    }
    let fatal = Fuse::new();
    let ctx = BridgeContext {
        min_split_size: config.min_split_size.get(),
        max_split_depth: config.max_split_depth,
        parallel,
        pool: &pool,
        fatal: &fatal,
    };
    bridge_indexed(producer, consumer, 0, &ctx)
}

fn bridge_indexed<P, C>(producer: P, consumer: C, depth: usize, ctx: &BridgeContext<'_>) -> C::Result
where
    P: Producer,
    C: Consumer<P::Item>,
{
    // A cancelled branch contributes an empty partial; the result is
    // discarded once the panic resurfaces at the join point.
    if ctx.fatal.is_set() {
        return consumer.folder().complete();
    }
    let len = producer.len();
    if consumer.full() || len <= ctx.min_split_size || depth >= ctx.max_split_depth {
        return consumer
            .folder()
            .consume_iter(producer.into_iter())
            .complete();
    }

    let (left_producer, right_producer) = producer.split_at(len / 2);
    let (left_consumer, right_consumer) = consumer.split();

    let (left, right) = if ctx.parallel {
        let job =
            StackJob::new(move || bridge_indexed(right_producer, right_consumer, depth + 1, ctx));
        // SAFETY: `job` is joined on both the success path and the unwind
        // path below, so it outlives its execution.
        unsafe { ctx.pool.spawn(job.as_job_ref()) };

        let left = match catch_unwind(AssertUnwindSafe(|| {
            bridge_indexed(left_producer, left_consumer, depth + 1, ctx)
        })) {
            Ok(left) => left,
            Err(payload) => {
                // Cancel outstanding branches, then drain the sibling before
                // resuming the unwind, so its stack job doesn't dangle.
                ctx.fatal.set();
                let _ = job.join(ctx.pool);
                resume_unwind(payload);
            }
        };
        let right = match job.join(ctx.pool) {
            Ok(right) => right,
            Err(payload) => {
                ctx.fatal.set();
                resume_unwind(payload);
            }
        };
        (left, right)
    } else {
        let left = bridge_indexed(left_producer, left_consumer, depth + 1, ctx);
        let right = bridge_indexed(right_producer, right_consumer, depth + 1, ctx);
        (left, right)
    };

    consumer.combine(left, right)
}

/// Runs an unindexed producer-consumer pair to completion.
///
/// Each split peels a materialised chunk off the front of the source; the
/// chunk is dispatched to the pool while the current thread keeps splitting
/// the remainder. Partial results are still combined left-then-right.
pub fn bridge_unindexed<P, C>(producer: P, consumer: C) -> C::Result
where
    P: UnindexedProducer,
    C: Consumer<P::Item>,
{
    assert!(
        !consumer.is_ordered(),
        "ordered consumers require an indexed producer"
    );
    let (config, pool) = config::snapshot();
    let parallel = config.num_threads.get() > 1;
    if !parallel {
        warn_sequential_once();
    }
    let fatal = Fuse::new();
    let ctx = BridgeContext {
        min_split_size: config.min_split_size.get(),
        max_split_depth: config.max_split_depth,
        parallel,
        pool: &pool,
        fatal: &fatal,
    };
    bridge_unindexed_inner(producer, consumer, 0, &ctx)
}

fn bridge_unindexed_inner<P, C>(
    producer: P,
    consumer: C,
    depth: usize,
    ctx: &BridgeContext<'_>,
) -> C::Result
where
    P: UnindexedProducer,
    C: Consumer<P::Item>,
{
    if ctx.fatal.is_set() {
        return consumer.folder().complete();
    }
    if consumer.full() || depth >= ctx.max_split_depth {
        return producer.fold_with(consumer.folder()).complete();
    }
    match producer.split() {
        (remainder, None) => remainder.fold_with(consumer.folder()).complete(),
        (chunk, Some(remainder)) => {
            let (left_consumer, right_consumer) = consumer.split();
            let (left, right) = if ctx.parallel {
                let job = StackJob::new(move || {
                    bridge_unindexed_inner(chunk, left_consumer, depth + 1, ctx)
                });
                // SAFETY: `job` is joined on both the success path and the
                // unwind path below, so it outlives its execution.
                unsafe { ctx.pool.spawn(job.as_job_ref()) };

                let right = match catch_unwind(AssertUnwindSafe(|| {
                    bridge_unindexed_inner(remainder, right_consumer, depth + 1, ctx)
                })) {
                    Ok(right) => right,
                    Err(payload) => {
                        ctx.fatal.set();
                        let _ = job.join(ctx.pool);
                        resume_unwind(payload);
                    }
                };
                let left = match job.join(ctx.pool) {
                    Ok(left) => left,
                    Err(payload) => {
                        ctx.fatal.set();
                        resume_unwind(payload);
                    }
                };
                (left, right)
            } else {
                let left = bridge_unindexed_inner(chunk, left_consumer, depth + 1, ctx);
                let right = bridge_unindexed_inner(remainder, right_consumer, depth + 1, ctx);
                (left, right)
            };
            consumer.combine(left, right)
        }
    }
}

/// Runs a producer-consumer pair on the current thread, without splitting.
///
/// No pool is touched and no configuration is read: the producer is
/// materialised in one piece and folded in order. Useful for debugging a
/// pipeline, or to force sequential execution regardless of the configured
/// thread count.
///
/// ```
/// use fastiter::bridge::bridge_sequential;
/// use fastiter::consumer::CollectConsumer;
/// use fastiter::producer::RangeProducer;
///
/// let items = bridge_sequential(RangeProducer::new(0, 5, 1), CollectConsumer);
/// assert_eq!(items, vec![0, 1, 2, 3, 4]);
/// ```
pub fn bridge_sequential<P, C>(producer: P, consumer: C) -> C::Result
where
    P: Producer,
    C: Consumer<P::Item>,
{
    consumer
        .folder()
        .consume_iter(producer.into_iter())
        .complete()
}
