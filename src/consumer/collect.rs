// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Materialising and side-effecting consumers: `collect` and `for_each`.

use super::{Consumer, Folder};

/// A consumer collecting every element into a vector, in producer order.
///
/// This is the one ordered consumer of the algebra: concatenation is not
/// commutative, so sibling partials must be combined left-then-right, which
/// the bridge guarantees for indexed producers.
pub struct CollectConsumer;

impl<T: Send> Consumer<T> for CollectConsumer {
    type Folder = CollectFolder<T>;
    type Result = Vec<T>;

    fn split(&self) -> (Self, Self) {
        (CollectConsumer, CollectConsumer)
    }

    fn folder(&self) -> CollectFolder<T> {
        CollectFolder { items: Vec::new() }
    }

    fn combine(&self, mut left: Vec<T>, right: Vec<T>) -> Vec<T> {
        left.extend(right);
        left
    }

    fn is_ordered(&self) -> bool {
        true
    }
}

/// Folder for [`CollectConsumer`].
pub struct CollectFolder<T> {
    items: Vec<T>,
}

impl<T> Folder<T> for CollectFolder<T> {
    type Result = Vec<T>;

    fn consume(mut self, item: T) -> Self {
        self.items.push(item);
        self
    }

    fn complete(self) -> Vec<T> {
        self.items
    }
}

/// A consumer running a function on every element, in no particular order.
pub struct ForEachConsumer<'f, F> {
    func: &'f F,
}

impl<'f, F> ForEachConsumer<'f, F> {
    pub(crate) fn new(func: &'f F) -> Self {
        Self { func }
    }
}

impl<'f, T, F> Consumer<T> for ForEachConsumer<'f, F>
where
    T: Send,
    F: Fn(T) + Sync,
{
    type Folder = ForEachFolder<'f, F>;
    type Result = ();

    fn split(&self) -> (Self, Self) {
        (Self { func: self.func }, Self { func: self.func })
    }

    fn folder(&self) -> ForEachFolder<'f, F> {
        ForEachFolder { func: self.func }
    }

    fn combine(&self, _left: (), _right: ()) {}
}

/// Folder for [`ForEachConsumer`].
pub struct ForEachFolder<'f, F> {
    func: &'f F,
}

impl<T, F> Folder<T> for ForEachFolder<'_, F>
where
    F: Fn(T),
{
    type Result = ();

    fn consume(self, item: T) -> Self {
        (self.func)(item);
        self
    }

    fn complete(self) {}
}

#[cfg(test)]
mod test {
    use super::super::test_util::check_split_combine_identity;
    use super::*;

    #[test]
    fn collect_split_combine_identity() {
        check_split_combine_identity(CollectConsumer, &[3, -1, 4, 1, -5, 9, 2, 6]);
    }

    #[test]
    fn collect_combine_concatenates_in_order() {
        let consumer = CollectConsumer;
        assert_eq!(
            consumer.combine(vec![1, 2], vec![3, 4, 5]),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn collect_is_ordered() {
        assert!(Consumer::<i64>::is_ordered(&CollectConsumer));
        assert!(!Consumer::<i64>::is_ordered(&super::super::CountConsumer));
    }

    #[test]
    fn for_each_visits_every_element() {
        let mut seen = Vec::new();
        {
            let record = std::sync::Mutex::new(&mut seen);
            let func = |x: i64| record.lock().unwrap().push(x);
            let consumer = ForEachConsumer::new(&func);
            consumer.folder().consume_iter([1i64, 2, 3]).complete();
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
