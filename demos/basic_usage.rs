// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A tour of the main pipeline operations.

use fastiter::{
    from_iterable, par_range, IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator,
    ThreadCount,
};

fn main() {
    fastiter::set_num_threads(ThreadCount::AvailableParallelism);
    println!("Worker threads: {}", fastiter::get_num_threads());

    // Reductions over a range.
    let sum: i64 = par_range(0, 10_000_000, 1).sum();
    println!("Sum of the first ten million integers: {sum}");

    let sum_of_squares: i64 = par_range(0, 10_000, 1).map(|x| x * x).sum();
    println!("Sum of the first ten thousand squares: {sum_of_squares}");

    // Ordered collection survives filtering.
    let evens = par_range(0, 20, 1).filter(|x| x % 2 == 0).collect();
    println!("Even numbers below twenty: {evens:?}");

    // Searching with keys.
    let words = ["parallel", "iterator", "bridge", "producer", "consumer"];
    let longest = words.par_iter().max_by_key(|w| w.len());
    println!("Longest word: {longest:?}");

    // Short-circuiting predicates.
    let has_large_square = par_range(0, 1_000_000, 1).any(|x| x * x > 1_000_000_000);
    println!("Some square exceeds a billion: {has_large_square}");

    // Sources of unknown length are consumed once, in buffered chunks.
    let total: i64 = from_iterable((0..1_000_000i64).filter(|x| x % 3 == 0)).sum();
    println!("Sum of multiples of three below a million: {total}");
}
