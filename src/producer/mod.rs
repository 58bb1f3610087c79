// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Splittable element sources.
//!
//! A [`Producer`] is an ordered, finite sequence of elements with a known
//! length, that can be split at an arbitrary index into two producers whose
//! concatenation is element-equivalent to the original. An
//! [`UnindexedProducer`] backs sources of unknown length (arbitrary
//! iterators) and splits by buffering a bounded chunk instead.

mod iterable;
mod range;
mod slice;

use crate::consumer::Folder;
pub use iterable::IterProducer;
pub use range::RangeProducer;
pub use slice::{SharedSliceProducer, SliceProducer, VecProducer};

/// An ordered element source with a known length, splittable at an index.
///
/// Producers are used linearly: splitting and materialising both consume the
/// producer, so a parent is never touched again once split.
pub trait Producer: Sized + Send {
    /// The type of elements this producer yields.
    type Item: Send;
    /// The sequential iterator this producer materialises into.
    type IntoIter: Iterator<Item = Self::Item>;

    /// Returns the number of elements this producer will yield.
    fn len(&self) -> usize;

    /// Returns whether this producer yields no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits this producer into two producers, the left yielding the first
    /// `index` elements and the right yielding the rest.
    ///
    /// `index == 0` and `index == len()` are legal and yield one empty
    /// sibling.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    fn split_at(self, index: usize) -> (Self, Self);

    /// Materialises this producer into a single-pass, in-order iterator.
    fn into_iter(self) -> Self::IntoIter;
}

/// An ordered element source of finite but unknown length.
pub trait UnindexedProducer: Sized + Send {
    /// The type of elements this producer yields.
    type Item: Send;

    /// Attempts to split off a materialised chunk of elements.
    ///
    /// Returns the chunk as the left producer; the right producer is the
    /// remainder of the source, or [`None`] when the source is exhausted and
    /// no further split is possible.
    fn split(self) -> (Self, Option<Self>);

    /// Feeds every remaining element into the folder, stopping early if the
    /// folder reports that it is full.
    fn fold_with<F: Folder<Self::Item>>(self, folder: F) -> F;
}
