// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Iterator adaptors to define parallel pipelines more conveniently.

mod source;

use crate::consumer::{
    AllConsumer, AnyConsumer, CollectConsumer, Consumer, CountConsumer, FilterConsumer,
    FoldConsumer, ForEachConsumer, Fuse, MapConsumer, MaxByKeyConsumer, MaxConsumer,
    MinByKeyConsumer, MinConsumer, ReduceConsumer, SumConsumer,
};
pub use source::{
    from_iterable, par_range, IntoParallelIterator, IntoParallelRefIterator, IterParIter,
    RangeParIter, SharedSliceParIter, SliceParIter, VecParIter,
};
use std::iter::Sum;

/// An iterator processing items in parallel.
///
/// Pipelines are built by stacking [`map()`](Self::map) and
/// [`filter()`](Self::filter) adaptors on a source, and run by one of the
/// terminal operations (`sum`, `count`, `reduce`, ...). Terminal operations
/// whose combine step is order-insensitive live here; order-sensitive ones
/// ([`collect()`](IndexedParallelIterator::collect) and
/// [`for_each_ordered()`](IndexedParallelIterator::for_each_ordered))
/// require an [`IndexedParallelIterator`].
pub trait ParallelIterator: Sized {
    /// The type of items this parallel iterator produces.
    type Item: Send;

    /// Feeds the elements of this iterator into the given consumer.
    ///
    /// This is the plumbing every terminal operation goes through; the
    /// consumer ends up paired with the source's producer at the bridge.
    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: Consumer<Self::Item>;

    /// Applies `f` to each item in parallel.
    ///
    /// `f` must be safe to call concurrently on distinct items; any side
    /// effects are observed in an unspecified order.
    ///
    /// ```
    /// # use fastiter::{par_range, IndexedParallelIterator, ParallelIterator};
    /// let squares = par_range(0, 10, 1).map(|x| x * x).collect();
    /// assert_eq!(squares, vec![0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
    /// ```
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        U: Send,
        F: Fn(Self::Item) -> U + Sync,
    {
        Map {
            inner: self,
            map_op: f,
        }
    }

    /// Keeps only the items for which `predicate` is true.
    ///
    /// ```
    /// # use fastiter::{par_range, IndexedParallelIterator, ParallelIterator};
    /// let evens = par_range(0, 20, 1).filter(|x| x % 2 == 0).collect();
    /// assert_eq!(evens, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]);
    /// ```
    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        P: Fn(&Self::Item) -> bool + Sync,
    {
        Filter {
            inner: self,
            predicate,
        }
    }

    /// Folds each sequential chunk into a single accumulator, producing a
    /// parallel iterator over the per-chunk results.
    ///
    /// `identity` seeds the accumulator of every chunk and `fold_op` folds
    /// one item into it. Where the chunk boundaries fall depends on the
    /// configuration and the thread count, so downstream operations should
    /// be insensitive to the exact partitioning, as in the usual
    /// fold-then-reduce pattern:
    ///
    /// ```
    /// # use fastiter::{par_range, ParallelIterator};
    /// let total: i64 = par_range(0, 1000, 1).fold(|| 0, |acc, x| acc + x).sum();
    /// assert_eq!(total, 499_500);
    /// ```
    ///
    /// The result is not indexed: the number and layout of chunks is an
    /// execution detail, so the order-sensitive terminal operations are not
    /// available on it.
    fn fold<R, ID, OP>(self, identity: ID, fold_op: OP) -> Fold<Self, ID, OP>
    where
        R: Send,
        ID: Fn() -> R + Sync,
        OP: Fn(R, Self::Item) -> R + Sync,
    {
        Fold {
            inner: self,
            identity,
            fold_op,
        }
    }

    /// Reduces the items to a single value.
    ///
    /// `identity` is called once per sequential chunk to seed the fold, so it
    /// must produce the neutral element of `op`; `op` must be associative
    /// for the result to be deterministic, and commutative as well when the
    /// source is unindexed.
    ///
    /// ```
    /// # use fastiter::{par_range, ParallelIterator};
    /// let factorial = par_range(1, 11, 1).reduce(|| 1, |a, b| a * b);
    /// assert_eq!(factorial, 3_628_800);
    /// ```
    fn reduce<ID, OP>(self, identity: ID, op: OP) -> Self::Item
    where
        ID: Fn() -> Self::Item + Sync,
        OP: Fn(Self::Item, Self::Item) -> Self::Item + Sync,
    {
        self.drive_unindexed(ReduceConsumer::new(&identity, &op))
    }

    /// Sums the items; an empty iterator yields the additive identity.
    fn sum<S>(self) -> S
    where
        S: Send + Sum<Self::Item> + Sum<S>,
    {
        self.drive_unindexed(SumConsumer::new())
    }

    /// Counts the items.
    fn count(self) -> usize {
        self.drive_unindexed(CountConsumer)
    }

    /// Returns the smallest item, or [`None`] if the iterator is empty.
    /// The leftmost of equal items wins.
    fn min(self) -> Option<Self::Item>
    where
        Self::Item: Ord,
    {
        self.drive_unindexed(MinConsumer)
    }

    /// Returns the item with the smallest key, or [`None`] if the iterator
    /// is empty. The leftmost of equal-keyed items wins.
    fn min_by_key<K, F>(self, key: F) -> Option<Self::Item>
    where
        K: Ord + Send,
        F: Fn(&Self::Item) -> K + Sync,
    {
        self.drive_unindexed(MinByKeyConsumer::new(&key))
            .map(|(_key, item)| item)
    }

    /// Returns the largest item, or [`None`] if the iterator is empty.
    /// The leftmost of equal items wins.
    fn max(self) -> Option<Self::Item>
    where
        Self::Item: Ord,
    {
        self.drive_unindexed(MaxConsumer)
    }

    /// Returns the item with the largest key, or [`None`] if the iterator is
    /// empty. The leftmost of equal-keyed items wins.
    ///
    /// ```
    /// # use fastiter::{IntoParallelRefIterator, ParallelIterator};
    /// let words = ["a", "abc", "ab", "abcdef"];
    /// let longest = words.par_iter().max_by_key(|s| s.len());
    /// assert_eq!(longest, Some(&"abcdef"));
    /// ```
    fn max_by_key<K, F>(self, key: F) -> Option<Self::Item>
    where
        K: Ord + Send,
        F: Fn(&Self::Item) -> K + Sync,
    {
        self.drive_unindexed(MaxByKeyConsumer::new(&key))
            .map(|(_key, item)| item)
    }

    /// Returns whether any item satisfies the predicate; an empty iterator
    /// yields false.
    ///
    /// Short-circuits: once a match is found, running chunks stop at their
    /// next item and unstarted branches are skipped.
    fn any<P>(self, predicate: P) -> bool
    where
        P: Fn(Self::Item) -> bool + Sync,
    {
        let fuse = Fuse::new();
        self.drive_unindexed(AnyConsumer::new(&predicate, &fuse))
    }

    /// Returns whether every item satisfies the predicate; an empty iterator
    /// yields true.
    ///
    /// Short-circuits on the first counterexample, like
    /// [`any()`](Self::any).
    fn all<P>(self, predicate: P) -> bool
    where
        P: Fn(Self::Item) -> bool + Sync,
    {
        let fuse = Fuse::new();
        self.drive_unindexed(AllConsumer::new(&predicate, &fuse))
    }

    /// Runs `f` on every item, in no particular order.
    ///
    /// `f` must be safe to call concurrently on distinct items. If `f`
    /// panics, items already processed are not rolled back.
    fn for_each<F>(self, f: F)
    where
        F: Fn(Self::Item) + Sync,
    {
        self.drive_unindexed(ForEachConsumer::new(&f))
    }
}

/// A parallel iterator backed by an indexed producer, able to run the
/// order-sensitive terminal operations.
pub trait IndexedParallelIterator: ParallelIterator {
    /// Collects every item into a vector, preserving the source order.
    ///
    /// ```
    /// # use fastiter::{IndexedParallelIterator, IntoParallelIterator};
    /// let xs = vec![3, 1, 4, 1, 5];
    /// assert_eq!(xs.clone().into_par_iter().collect(), xs);
    /// ```
    fn collect(self) -> Vec<Self::Item> {
        self.drive_unindexed(CollectConsumer)
    }

    /// Runs `f` on every item in source order.
    ///
    /// Side-effect order cannot be restored by any combine step after the
    /// fact, so the items are first collected in parallel and `f` is then
    /// applied sequentially, left to right.
    fn for_each_ordered<F>(self, mut f: F)
    where
        F: FnMut(Self::Item),
    {
        for item in self.collect() {
            f(item);
        }
    }
}

/// A parallel iterator applying a function to each item of an inner
/// iterator. This struct is created by the
/// [`map()`](ParallelIterator::map) method.
#[must_use = "iterator adaptors are lazy"]
pub struct Map<I, F> {
    inner: I,
    map_op: F,
}

impl<I, U, F> ParallelIterator for Map<I, F>
where
    I: ParallelIterator,
    U: Send,
    F: Fn(I::Item) -> U + Sync,
{
    type Item = U;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: Consumer<U>,
    {
        let Map { inner, map_op } = self;
        inner.drive_unindexed(MapConsumer::new(consumer, &map_op))
    }
}

impl<I, U, F> IndexedParallelIterator for Map<I, F>
where
    I: IndexedParallelIterator,
    U: Send,
    F: Fn(I::Item) -> U + Sync,
{
}

/// A parallel iterator over the per-chunk results of a chunk-wise fold.
/// This struct is created by the [`fold()`](ParallelIterator::fold) method.
#[must_use = "iterator adaptors are lazy"]
pub struct Fold<I, ID, OP> {
    inner: I,
    identity: ID,
    fold_op: OP,
}

impl<I, R, ID, OP> ParallelIterator for Fold<I, ID, OP>
where
    I: ParallelIterator,
    R: Send,
    ID: Fn() -> R + Sync,
    OP: Fn(R, I::Item) -> R + Sync,
{
    type Item = R;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: Consumer<R>,
    {
        let Fold {
            inner,
            identity,
            fold_op,
        } = self;
        inner.drive_unindexed(FoldConsumer::new(consumer, &identity, &fold_op))
    }
}

/// A parallel iterator keeping the items of an inner iterator that satisfy a
/// predicate. This struct is created by the
/// [`filter()`](ParallelIterator::filter) method.
#[must_use = "iterator adaptors are lazy"]
pub struct Filter<I, P> {
    inner: I,
    predicate: P,
}

impl<I, P> ParallelIterator for Filter<I, P>
where
    I: ParallelIterator,
    P: Fn(&I::Item) -> bool + Sync,
{
    type Item = I::Item;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: Consumer<I::Item>,
    {
        let Filter { inner, predicate } = self;
        inner.drive_unindexed(FilterConsumer::new(consumer, &predicate))
    }
}

impl<I, P> IndexedParallelIterator for Filter<I, P>
where
    I: IndexedParallelIterator,
    P: Fn(&I::Item) -> bool + Sync,
{
}
