// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Short-circuiting predicate consumers: `any` and `all`.
//!
//! Every sibling split from the root consumer shares one [`Fuse`]. The first
//! folder to reach a definitive answer sets the fuse; the bridge then stops
//! spawning new branches, and running folders observe the fuse at their next
//! element and stop consuming. A short-circuited sibling contributes its
//! current partial, which the latched boolean combine absorbs.

use super::{Consumer, Folder};
use crate::util::Fuse;

/// A consumer deciding whether any element satisfies a predicate; latches
/// true. The empty stream yields false.
pub struct AnyConsumer<'f, P> {
    predicate: &'f P,
    fuse: &'f Fuse,
}

impl<'f, P> AnyConsumer<'f, P> {
    /// Creates a consumer sharing the given fuse with all its future
    /// siblings.
    pub fn new(predicate: &'f P, fuse: &'f Fuse) -> Self {
        Self { predicate, fuse }
    }
}

impl<'f, T, P> Consumer<T> for AnyConsumer<'f, P>
where
    T: Send,
    P: Fn(T) -> bool + Sync,
{
    type Folder = AnyFolder<'f, P>;
    type Result = bool;

    fn split(&self) -> (Self, Self) {
        (
            Self::new(self.predicate, self.fuse),
            Self::new(self.predicate, self.fuse),
        )
    }

    fn folder(&self) -> AnyFolder<'f, P> {
        AnyFolder {
            predicate: self.predicate,
            fuse: self.fuse,
            found: false,
        }
    }

    fn combine(&self, left: bool, right: bool) -> bool {
        left || right
    }

    fn full(&self) -> bool {
        self.fuse.is_set()
    }
}

/// Folder for [`AnyConsumer`].
pub struct AnyFolder<'f, P> {
    predicate: &'f P,
    fuse: &'f Fuse,
    found: bool,
}

impl<T, P> Folder<T> for AnyFolder<'_, P>
where
    P: Fn(T) -> bool,
{
    type Result = bool;

    fn consume(mut self, item: T) -> Self {
        if (self.predicate)(item) {
            self.found = true;
            self.fuse.set();
        }
        self
    }

    fn complete(self) -> bool {
        self.found
    }

    fn full(&self) -> bool {
        self.found || self.fuse.is_set()
    }
}

/// A consumer deciding whether all elements satisfy a predicate; latches
/// false. The empty stream yields true.
pub struct AllConsumer<'f, P> {
    predicate: &'f P,
    fuse: &'f Fuse,
}

impl<'f, P> AllConsumer<'f, P> {
    /// Creates a consumer sharing the given fuse with all its future
    /// siblings.
    pub fn new(predicate: &'f P, fuse: &'f Fuse) -> Self {
        Self { predicate, fuse }
    }
}

impl<'f, T, P> Consumer<T> for AllConsumer<'f, P>
where
    T: Send,
    P: Fn(T) -> bool + Sync,
{
    type Folder = AllFolder<'f, P>;
    type Result = bool;

    fn split(&self) -> (Self, Self) {
        (
            Self::new(self.predicate, self.fuse),
            Self::new(self.predicate, self.fuse),
        )
    }

    fn folder(&self) -> AllFolder<'f, P> {
        AllFolder {
            predicate: self.predicate,
            fuse: self.fuse,
            failed: false,
        }
    }

    fn combine(&self, left: bool, right: bool) -> bool {
        left && right
    }

    fn full(&self) -> bool {
        self.fuse.is_set()
    }
}

/// Folder for [`AllConsumer`].
pub struct AllFolder<'f, P> {
    predicate: &'f P,
    fuse: &'f Fuse,
    failed: bool,
}

impl<T, P> Folder<T> for AllFolder<'_, P>
where
    P: Fn(T) -> bool,
{
    type Result = bool;

    fn consume(mut self, item: T) -> Self {
        if !(self.predicate)(item) {
            self.failed = true;
            self.fuse.set();
        }
        self
    }

    fn complete(self) -> bool {
        !self.failed
    }

    fn full(&self) -> bool {
        self.failed || self.fuse.is_set()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // The latched consumers share a fuse across siblings, so the identity is
    // checked with a fresh fuse per split rather than through
    // `check_split_combine_identity`.
    #[test]
    fn any_split_combine_identity() {
        let items = [3i64, -1, 4, 1, -5, 9, 2, 6];
        for (predicate, expected) in [
            (((|x: i64| x > 4) as fn(i64) -> bool), true),
            ((|x: i64| x > 100) as fn(i64) -> bool, false),
        ] {
            for index in 0..=items.len() {
                let fuse = Fuse::new();
                let consumer = AnyConsumer::new(&predicate, &fuse);
                let (left, right) = consumer.split();
                let left_result = left
                    .folder()
                    .consume_iter(items[..index].iter().copied())
                    .complete();
                let right_result = right
                    .folder()
                    .consume_iter(items[index..].iter().copied())
                    .complete();
                assert_eq!(consumer.combine(left_result, right_result), expected);
            }
        }
    }

    #[test]
    fn all_split_combine_identity() {
        let items = [3i64, 1, 4, 1, 5];
        for (predicate, expected) in [
            ((|x: i64| x > 0) as fn(i64) -> bool, true),
            ((|x: i64| x != 4) as fn(i64) -> bool, false),
        ] {
            for index in 0..=items.len() {
                let fuse = Fuse::new();
                let consumer = AllConsumer::new(&predicate, &fuse);
                let (left, right) = consumer.split();
                let left_result = left
                    .folder()
                    .consume_iter(items[..index].iter().copied())
                    .complete();
                let right_result = right
                    .folder()
                    .consume_iter(items[index..].iter().copied())
                    .complete();
                assert_eq!(consumer.combine(left_result, right_result), expected);
            }
        }
    }

    #[test]
    fn any_of_empty_is_false() {
        let predicate = |_: i64| true;
        let fuse = Fuse::new();
        let consumer = AnyConsumer::new(&predicate, &fuse);
        assert!(!consumer.folder().complete());
    }

    #[test]
    fn all_of_empty_is_true() {
        let predicate = |_: i64| false;
        let fuse = Fuse::new();
        let consumer = AllConsumer::new(&predicate, &fuse);
        assert!(consumer.folder().complete());
    }

    #[test]
    fn any_stops_consuming_after_a_match() {
        let calls = AtomicUsize::new(0);
        let predicate = |x: i64| {
            calls.fetch_add(1, Ordering::Relaxed);
            x == 2
        };
        let fuse = Fuse::new();
        let consumer = AnyConsumer::new(&predicate, &fuse);
        let result = consumer
            .folder()
            .consume_iter([0i64, 1, 2, 3, 4, 5, 6, 7])
            .complete();
        assert!(result);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn a_set_fuse_stops_sibling_folders() {
        let calls = AtomicUsize::new(0);
        let predicate = |_: i64| {
            calls.fetch_add(1, Ordering::Relaxed);
            false
        };
        let fuse = Fuse::new();
        let consumer = AnyConsumer::new(&predicate, &fuse);
        let (left, _right) = consumer.split();
        fuse.set();
        assert!(Consumer::<i64>::full(&left));
        let result = left.folder().consume_iter([1i64, 2, 3]).complete();
        assert!(!result);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
