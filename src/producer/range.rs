// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::Producer;

/// A producer over an arithmetic progression `start, start + step, ...`
/// stopping before `stop`.
///
/// The step may be negative for a descending progression; a zero step is
/// rejected at construction.
pub struct RangeProducer {
    start: i64,
    stop: i64,
    step: i64,
}

impl RangeProducer {
    /// Creates a producer over the progression from `start` (inclusive) to
    /// `stop` (exclusive) with the given step.
    ///
    /// # Panics
    ///
    /// Panics if `step == 0`, or if the progression contains more than
    /// [`usize::MAX`] elements.
    pub fn new(start: i64, stop: i64, step: i64) -> Self {
        assert!(step != 0, "range step cannot be zero");
        let producer = Self { start, stop, step };
        // Materialize the length eagerly so that an oversized progression
        // fails here rather than in the middle of a pipeline.
        producer.length();
        producer
    }

    fn length(&self) -> usize {
        let span = self.stop as i128 - self.start as i128;
        let step = self.step as i128;
        let count = if step > 0 {
            if span <= 0 {
                0
            } else {
                (span + step - 1) / step
            }
        } else if span >= 0 {
            0
        } else {
            (span + step + 1) / step
        };
        count.try_into().unwrap_or_else(|_| {
            panic!(
                "cannot iterate over a range with more than usize::MAX items ({})",
                usize::MAX
            )
        })
    }
}

impl Producer for RangeProducer {
    type Item = i64;
    type IntoIter = RangeIter;

    fn len(&self) -> usize {
        self.length()
    }

    fn split_at(self, index: usize) -> (Self, Self) {
        let len = self.length();
        assert!(
            index <= len,
            "split index {index} out of range for a producer of length {len}"
        );
        // The value at `index` fits in i64 for index < len; clamp to `stop`
        // so that splitting at `len` doesn't overflow past the progression.
        let mid = self.start as i128 + index as i128 * self.step as i128;
        let mid = if self.step > 0 {
            mid.min(self.stop as i128)
        } else {
            mid.max(self.stop as i128)
        } as i64;
        (
            Self {
                start: self.start,
                stop: mid,
                step: self.step,
            },
            Self {
                start: mid,
                stop: self.stop,
                step: self.step,
            },
        )
    }

    fn into_iter(self) -> RangeIter {
        RangeIter {
            next: self.start,
            remaining: self.length(),
            step: self.step,
        }
    }
}

/// Sequential iterator over an arithmetic progression.
pub struct RangeIter {
    next: i64,
    remaining: usize,
    step: i64,
}

impl Iterator for RangeIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.next;
        self.remaining -= 1;
        if self.remaining != 0 {
            self.next += self.step;
        }
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RangeIter {}
