// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Small synchronization helpers shared by the pool and the consumers.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

/// An ergonomic wrapper around a [`Mutex`]-[`Condvar`] pair.
pub(crate) struct Status<T> {
    mutex: Mutex<T>,
    condvar: Condvar,
}

impl<T> Status<T> {
    /// Creates a new status initialized with the given value.
    pub fn new(t: T) -> Self {
        Self {
            mutex: Mutex::new(t),
            condvar: Condvar::new(),
        }
    }

    /// Applies `f` to the status under the lock, without notifying anyone.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.mutex.lock().unwrap())
    }

    /// Applies `f` to the status under the lock and notifies one waiting
    /// thread.
    pub fn with_notify_one<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.mutex.lock().unwrap());
        self.condvar.notify_one();
        result
    }

    /// Applies `f` to the status under the lock and notifies all waiting
    /// threads.
    pub fn with_notify_all<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.mutex.lock().unwrap());
        self.condvar.notify_all();
        result
    }

    /// Waits until the predicate is false on this status.
    ///
    /// This returns a [`MutexGuard`], allowing to further inspect or modify
    /// the status.
    pub fn wait_while(&self, predicate: impl FnMut(&mut T) -> bool) -> MutexGuard<'_, T> {
        self.condvar
            .wait_while(self.mutex.lock().unwrap(), predicate)
            .unwrap()
    }
}

/// A fuse is an atomic object that starts unset and can transition once to the
/// set state.
///
/// Under the hood, this contains an atomic boolean aligned to a cache line to
/// avoid any risk of false sharing performance overhead.
pub struct Fuse(CachePadded<AtomicBool>);

impl Fuse {
    /// Creates a new fuse in the unset state.
    pub fn new() -> Self {
        Fuse(CachePadded::new(AtomicBool::new(false)))
    }

    /// Sets this fuse.
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed)
    }

    /// Returns whether this fuse has been set.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for Fuse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fuse_latches() {
        let fuse = Fuse::new();
        assert!(!fuse.is_set());
        fuse.set();
        assert!(fuse.is_set());
        fuse.set();
        assert!(fuse.is_set());
    }

    #[test]
    fn status_notifies_waiter() {
        let status = Arc::new(Status::new(false));
        let waiter = std::thread::spawn({
            let status = status.clone();
            move || {
                let guard = status.wait_while(|ready| !*ready);
                assert!(*guard);
            }
        });
        status.with_notify_all(|ready| *ready = true);
        waiter.join().unwrap();
    }

    #[test]
    fn status_with_returns_result() {
        let status = Status::new(41);
        let value = status.with_notify_one(|x| {
            *x += 1;
            *x
        });
        assert_eq!(value, 42);
        assert_eq!(status.with(|x| *x), 42);
    }
}
