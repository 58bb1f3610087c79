// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Adapter consumers transforming the element stream ahead of a downstream
//! consumer.
//!
//! Adapters stack: every `map`/`filter`/`fold` call on a pipeline pushes one
//! more layer around the terminal consumer, and the bridge receives the
//! fully wrapped consumer together with a raw producer. Splitting an adapter
//! splits the downstream consumer and rewraps both siblings; combine, full
//! and orderedness all delegate downstream.

use super::{Consumer, Folder};

/// An adapter applying a function to each element before the downstream
/// consumer sees it.
pub struct MapConsumer<'f, C, F> {
    base: C,
    map_op: &'f F,
}

impl<'f, C, F> MapConsumer<'f, C, F> {
    pub(crate) fn new(base: C, map_op: &'f F) -> Self {
        Self { base, map_op }
    }
}

impl<'f, T, U, C, F> Consumer<T> for MapConsumer<'f, C, F>
where
    T: Send,
    U: Send,
    C: Consumer<U>,
    F: Fn(T) -> U + Sync,
{
    type Folder = MapFolder<'f, C::Folder, F>;
    type Result = C::Result;

    fn split(&self) -> (Self, Self) {
        let (left, right) = self.base.split();
        (
            Self {
                base: left,
                map_op: self.map_op,
            },
            Self {
                base: right,
                map_op: self.map_op,
            },
        )
    }

    fn folder(&self) -> Self::Folder {
        MapFolder {
            base: self.base.folder(),
            map_op: self.map_op,
        }
    }

    fn combine(&self, left: Self::Result, right: Self::Result) -> Self::Result {
        self.base.combine(left, right)
    }

    fn full(&self) -> bool {
        self.base.full()
    }

    fn is_ordered(&self) -> bool {
        self.base.is_ordered()
    }
}

/// Folder for [`MapConsumer`].
pub struct MapFolder<'f, G, F> {
    base: G,
    map_op: &'f F,
}

impl<T, U, G, F> Folder<T> for MapFolder<'_, G, F>
where
    G: Folder<U>,
    F: Fn(T) -> U,
{
    type Result = G::Result;

    fn consume(self, item: T) -> Self {
        Self {
            base: self.base.consume((self.map_op)(item)),
            map_op: self.map_op,
        }
    }

    fn complete(self) -> Self::Result {
        self.base.complete()
    }

    fn full(&self) -> bool {
        self.base.full()
    }
}

/// An adapter dropping the elements for which a predicate is false.
pub struct FilterConsumer<'f, C, P> {
    base: C,
    predicate: &'f P,
}

impl<'f, C, P> FilterConsumer<'f, C, P> {
    pub(crate) fn new(base: C, predicate: &'f P) -> Self {
        Self { base, predicate }
    }
}

impl<'f, T, C, P> Consumer<T> for FilterConsumer<'f, C, P>
where
    T: Send,
    C: Consumer<T>,
    P: Fn(&T) -> bool + Sync,
{
    type Folder = FilterFolder<'f, C::Folder, P>;
    type Result = C::Result;

    fn split(&self) -> (Self, Self) {
        let (left, right) = self.base.split();
        (
            Self {
                base: left,
                predicate: self.predicate,
            },
            Self {
                base: right,
                predicate: self.predicate,
            },
        )
    }

    fn folder(&self) -> Self::Folder {
        FilterFolder {
            base: self.base.folder(),
            predicate: self.predicate,
        }
    }

    fn combine(&self, left: Self::Result, right: Self::Result) -> Self::Result {
        self.base.combine(left, right)
    }

    fn full(&self) -> bool {
        self.base.full()
    }

    fn is_ordered(&self) -> bool {
        self.base.is_ordered()
    }
}

/// Folder for [`FilterConsumer`].
pub struct FilterFolder<'f, G, P> {
    base: G,
    predicate: &'f P,
}

impl<T, G, P> Folder<T> for FilterFolder<'_, G, P>
where
    G: Folder<T>,
    P: Fn(&T) -> bool,
{
    type Result = G::Result;

    fn consume(self, item: T) -> Self {
        if (self.predicate)(&item) {
            Self {
                base: self.base.consume(item),
                predicate: self.predicate,
            }
        } else {
            self
        }
    }

    fn complete(self) -> Self::Result {
        self.base.complete()
    }

    fn full(&self) -> bool {
        self.base.full()
    }
}

/// An adapter folding a whole chunk into one accumulator, handing the
/// downstream consumer a single element per chunk.
///
/// Every chunk contributes exactly one element, seeded from `identity`, so
/// an empty chunk still passes the identity value downstream.
pub struct FoldConsumer<'f, C, ID, OP> {
    base: C,
    identity: &'f ID,
    fold_op: &'f OP,
}

impl<'f, C, ID, OP> FoldConsumer<'f, C, ID, OP> {
    pub(crate) fn new(base: C, identity: &'f ID, fold_op: &'f OP) -> Self {
        Self {
            base,
            identity,
            fold_op,
        }
    }
}

impl<'f, T, R, C, ID, OP> Consumer<T> for FoldConsumer<'f, C, ID, OP>
where
    T: Send,
    R: Send,
    C: Consumer<R>,
    ID: Fn() -> R + Sync,
    OP: Fn(R, T) -> R + Sync,
{
    type Folder = FoldFolder<'f, C::Folder, OP, R>;
    type Result = C::Result;

    fn split(&self) -> (Self, Self) {
        let (left, right) = self.base.split();
        (
            Self {
                base: left,
                identity: self.identity,
                fold_op: self.fold_op,
            },
            Self {
                base: right,
                identity: self.identity,
                fold_op: self.fold_op,
            },
        )
    }

    fn folder(&self) -> Self::Folder {
        FoldFolder {
            base: self.base.folder(),
            fold_op: self.fold_op,
            acc: (self.identity)(),
        }
    }

    fn combine(&self, left: Self::Result, right: Self::Result) -> Self::Result {
        self.base.combine(left, right)
    }

    fn full(&self) -> bool {
        self.base.full()
    }

    fn is_ordered(&self) -> bool {
        self.base.is_ordered()
    }
}

/// Folder for [`FoldConsumer`].
pub struct FoldFolder<'f, G, OP, R> {
    base: G,
    fold_op: &'f OP,
    acc: R,
}

impl<T, R, G, OP> Folder<T> for FoldFolder<'_, G, OP, R>
where
    G: Folder<R>,
    OP: Fn(R, T) -> R,
{
    type Result = G::Result;

    fn consume(self, item: T) -> Self {
        Self {
            base: self.base,
            fold_op: self.fold_op,
            acc: (self.fold_op)(self.acc, item),
        }
    }

    fn complete(self) -> Self::Result {
        self.base.consume(self.acc).complete()
    }

    fn full(&self) -> bool {
        self.base.full()
    }
}
