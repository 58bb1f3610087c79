// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::UnindexedProducer;
use crate::consumer::Folder;
use std::iter::Peekable;

/// An unindexed producer over an arbitrary iterator.
///
/// Splitting buffers up to `chunk_size` elements from the source into a
/// materialised chunk (the left sibling); the remainder of the source, if
/// any, becomes the right sibling. The source is consumed exactly once
/// across the whole recursion, and buffering is the only mutation.
pub struct IterProducer<I: Iterator> {
    state: State<I>,
    chunk_size: usize,
}

enum State<I: Iterator> {
    /// A materialised chunk, produced by a previous split.
    Buffered(Vec<I::Item>),
    /// The not-yet-consumed remainder of the source.
    Streaming(Peekable<I>),
}

impl<I: Iterator> IterProducer<I> {
    /// Wraps an iterator, buffering `chunk_size` elements per split.
    pub fn new(iter: I, chunk_size: usize) -> Self {
        Self {
            state: State::Streaming(iter.peekable()),
            chunk_size,
        }
    }
}

impl<I> UnindexedProducer for IterProducer<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Item = I::Item;

    fn split(self) -> (Self, Option<Self>) {
        let Self { state, chunk_size } = self;
        match state {
            // A buffered chunk has no source left to pull from.
            State::Buffered(items) => (
                Self {
                    state: State::Buffered(items),
                    chunk_size,
                },
                None,
            ),
            State::Streaming(mut iter) => {
                let mut buffer = Vec::with_capacity(chunk_size.min(1024));
                while buffer.len() < chunk_size {
                    match iter.next() {
                        Some(item) => buffer.push(item),
                        None => break,
                    }
                }
                let left = Self {
                    state: State::Buffered(buffer),
                    chunk_size,
                };
                let right = iter.peek().is_some().then(|| Self {
                    state: State::Streaming(iter),
                    chunk_size,
                });
                (left, right)
            }
        }
    }

    fn fold_with<F: Folder<Self::Item>>(self, folder: F) -> F {
        match self.state {
            State::Buffered(items) => folder.consume_iter(items),
            State::Streaming(iter) => folder.consume_iter(iter),
        }
    }
}
