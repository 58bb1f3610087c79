// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A worker pool executing spawned bridge tasks.
//!
//! The pool is a fixed set of worker threads draining a shared injector
//! queue. Tasks are stack-allocated in the spawning bridge frame
//! ([`StackJob`]) and enqueued as lifetime-erased references, which is sound
//! because the bridge always joins a task before its frame is popped.

use crate::macros::{log_debug, log_error, log_warn};
use crate::util::Status;
// Platforms that support `libc::sched_setaffinity()`.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
use nix::{
    sched::{sched_setaffinity, CpuSet},
    unistd::Pid,
};
use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Number of threads to spawn in the worker pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadCount {
    /// Spawn the number of threads returned by
    /// [`std::thread::available_parallelism()`].
    AvailableParallelism,
    /// Spawn the given number of threads.
    Count(NonZeroUsize),
}

impl TryFrom<usize> for ThreadCount {
    type Error = <NonZeroUsize as TryFrom<usize>>::Error;

    fn try_from(thread_count: usize) -> Result<Self, Self::Error> {
        let count = NonZeroUsize::try_from(thread_count)?;
        Ok(ThreadCount::Count(count))
    }
}

/// Policy to pin worker threads to CPUs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuPinning {
    /// Don't pin worker threads to CPUs.
    No,
    /// Pin each worker thread to a CPU, if CPU pinning is supported and
    /// implemented on this platform.
    IfSupported,
    /// Pin each worker thread to a CPU. If CPU pinning isn't supported on this
    /// platform (or not implemented), building the pool will panic.
    Always,
}

/// A lifetime-erased reference to a job waiting in the injector queue.
pub(crate) struct JobRef {
    ptr: *const (),
    execute_fn: unsafe fn(*const ()),
}

// SAFETY: A `JobRef` is only ever created from a `StackJob` whose closure is
// `Send`, and is executed exactly once, on a single thread.
unsafe impl Send for JobRef {}

impl JobRef {
    /// Executes the underlying job. Must be called at most once.
    unsafe fn execute(self) {
        (self.execute_fn)(self.ptr)
    }
}

/// A latch signalled exactly once, when the associated job has completed.
pub(crate) struct Latch {
    done: Status<bool>,
}

impl Latch {
    fn new() -> Self {
        Self {
            done: Status::new(false),
        }
    }

    fn set(&self) {
        self.done.with_notify_all(|done| *done = true);
    }

    fn probe(&self) -> bool {
        self.done.with(|done| *done)
    }

    fn wait(&self) {
        let guard = self.done.wait_while(|done| !*done);
        debug_assert!(*guard);
    }
}

/// A unit of work allocated in the spawning stack frame.
///
/// The job owns the closure to run and a slot for its (possibly panicked)
/// result. The spawner must call [`join()`](Self::join) before the job goes
/// out of scope, so that the queued [`JobRef`] never dangles.
pub(crate) struct StackJob<F, R> {
    func: UnsafeCell<Option<F>>,
    result: UnsafeCell<Option<std::thread::Result<R>>>,
    latch: Latch,
}

// SAFETY: The executing thread has exclusive access to `func` and `result`
// between the `spawn()` and the moment the latch is set; the owning thread
// only reads `result` after the latch is set (in `join()`).
unsafe impl<F: Send, R: Send> Sync for StackJob<F, R> {}

impl<F: FnOnce() -> R + Send, R: Send> StackJob<F, R> {
    pub fn new(func: F) -> Self {
        Self {
            func: UnsafeCell::new(Some(func)),
            result: UnsafeCell::new(None),
            latch: Latch::new(),
        }
    }

    /// Returns a queueable reference to this job.
    ///
    /// # Safety
    ///
    /// The caller must keep the job alive until the latch is set, i.e. call
    /// [`join()`](Self::join) (or otherwise wait for the latch) before the
    /// job is dropped.
    pub unsafe fn as_job_ref(&self) -> JobRef {
        JobRef {
            ptr: self as *const Self as *const (),
            execute_fn: Self::execute,
        }
    }

    unsafe fn execute(this: *const ()) {
        let job = &*(this as *const Self);
        let func = (*job.func.get()).take().expect("job executed twice");
        // Unwinding is captured here and re-raised at the join point, so a
        // panicking user callable doesn't take down the worker thread.
        let result = catch_unwind(AssertUnwindSafe(func));
        *job.result.get() = Some(result);
        job.latch.set();
    }

    /// Waits until this job has completed and returns its result.
    ///
    /// While the job hasn't started, the calling thread executes other queued
    /// jobs instead of blocking, which keeps the pool live even when every
    /// worker is itself waiting on a spawned sibling.
    pub fn join(&self, pool: &WorkerPool) -> std::thread::Result<R> {
        pool.wait_for(&self.latch);
        // SAFETY: The latch has been set, so the executing thread is done
        // writing the result and won't touch the job again.
        let result = unsafe { (*self.result.get()).take() };
        result.expect("job completed without a result")
    }
}

/// State of the injector queue shared by all the worker threads.
struct QueueState {
    jobs: VecDeque<JobRef>,
    shutdown: bool,
}

/// The injector queue: spawned jobs are pushed at the back and popped from
/// the front by idle workers (or by threads waiting on a latch).
struct JobQueue {
    state: Status<QueueState>,
}

impl JobQueue {
    fn new() -> Self {
        Self {
            state: Status::new(QueueState {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
        }
    }

    fn push(&self, job: JobRef) {
        self.state.with_notify_one(|state| state.jobs.push_back(job));
    }

    fn try_pop(&self) -> Option<JobRef> {
        self.state.with(|state| state.jobs.pop_front())
    }

    /// Blocks until a job is available or the queue is shut down and empty.
    ///
    /// Shutdown drains: queued jobs are still handed out after the shutdown
    /// signal, and `None` is only returned once the queue is empty.
    fn pop(&self) -> Option<JobRef> {
        let mut guard = self
            .state
            .wait_while(|state| state.jobs.is_empty() && !state.shutdown);
        guard.jobs.pop_front()
    }

    fn shutdown(&self) {
        self.state.with_notify_all(|state| state.shutdown = true);
    }
}

/// Handle to a worker thread in the pool.
struct WorkerThreadHandle {
    handle: JoinHandle<()>,
}

/// A pool of worker threads executing spawned bridge tasks.
pub(crate) struct WorkerPool {
    queue: Arc<JobQueue>,
    threads: Vec<WorkerThreadHandle>,
}

impl WorkerPool {
    /// Spawns a pool with the given number of worker threads.
    pub fn new(num_threads: NonZeroUsize, cpu_pinning: CpuPinning) -> Self {
        let queue = Arc::new(JobQueue::new());

        #[cfg(any(
            miri,
            not(any(
                target_os = "android",
                target_os = "dragonfly",
                target_os = "freebsd",
                target_os = "linux"
            ))
        ))]
        match cpu_pinning {
            CpuPinning::No => (),
            CpuPinning::IfSupported => {
                log_warn!("Pinning threads to CPUs is not implemented on this platform.")
            }
            CpuPinning::Always => {
                panic!("Pinning threads to CPUs is not implemented on this platform.")
            }
        }

        let threads = (0..num_threads.get())
            .map(|id| {
                let queue = queue.clone();
                let handle = std::thread::Builder::new()
                    .name(format!("fastiter-worker-{id}"))
                    .spawn(move || {
                        pin_current_thread(id, cpu_pinning);
                        worker_loop(&queue);
                    })
                    .expect("failed to spawn a worker thread");
                WorkerThreadHandle { handle }
            })
            .collect();
        log_debug!("[pool] Spawned {num_threads} worker threads");

        Self { queue, threads }
    }

    /// Returns the number of worker threads spawned in this pool.
    pub fn num_threads(&self) -> NonZeroUsize {
        self.threads.len().try_into().unwrap()
    }

    /// Enqueues a job for execution on a worker thread.
    ///
    /// # Safety
    ///
    /// The underlying [`StackJob`] must outlive its execution; see
    /// [`StackJob::as_job_ref()`].
    pub unsafe fn spawn(&self, job: JobRef) {
        self.queue.push(job);
    }

    /// Waits until the given latch is set, executing other queued jobs in the
    /// meantime.
    fn wait_for(&self, latch: &Latch) {
        loop {
            if latch.probe() {
                return;
            }
            match self.queue.try_pop() {
                // SAFETY: the job's `StackJob` is kept alive by its spawning
                // frame until the job's latch is set.
                Some(job) => unsafe { job.execute() },
                None => {
                    // The awaited job is no longer queued, so it is running
                    // on (or already finished by) another thread and the
                    // latch is the only thing left to wait for.
                    latch.wait();
                    return;
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    /// Drains the queue and joins all the worker threads.
    #[allow(clippy::unused_enumerate_index)]
    fn drop(&mut self) {
        self.queue.shutdown();

        log_debug!("[pool] Joining worker threads...");
        for (_i, t) in self.threads.drain(..).enumerate() {
            let result = t.handle.join();
            match result {
                Ok(_) => log_debug!("[pool] Worker {_i} joined"),
                Err(_) => log_error!("[pool] Worker {_i} joined with a panic: {result:?}"),
            }
        }
        log_debug!("[pool] Joined worker threads.");
    }
}

/// Main loop run by each worker thread.
fn worker_loop(queue: &JobQueue) {
    while let Some(job) = queue.pop() {
        // SAFETY: the job's `StackJob` is kept alive by its spawning frame
        // until the job's latch is set. Panics are captured inside
        // `StackJob::execute`, so the worker survives failing jobs.
        unsafe { job.execute() };
    }
    log_debug!("[pool] Worker received shutdown signal");
}

#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
fn pin_current_thread(id: usize, cpu_pinning: CpuPinning) {
    match cpu_pinning {
        CpuPinning::No => (),
        CpuPinning::IfSupported => {
            let mut cpu_set = CpuSet::new();
            if let Err(_e) = cpu_set.set(id) {
                log_warn!("Failed to set CPU affinity for thread #{id}: {_e}");
            } else if let Err(_e) = sched_setaffinity(Pid::from_raw(0), &cpu_set) {
                log_warn!("Failed to set CPU affinity for thread #{id}: {_e}");
            } else {
                log_debug!("Pinned thread #{id} to CPU #{id}");
            }
        }
        CpuPinning::Always => {
            let mut cpu_set = CpuSet::new();
            if let Err(e) = cpu_set.set(id) {
                panic!("Failed to set CPU affinity for thread #{id}: {e}");
            } else if let Err(e) = sched_setaffinity(Pid::from_raw(0), &cpu_set) {
                panic!("Failed to set CPU affinity for thread #{id}: {e}");
            } else {
                log_debug!("Pinned thread #{id} to CPU #{id}");
            }
        }
    }
}

#[cfg(any(
    miri,
    not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    ))
))]
fn pin_current_thread(_id: usize, _cpu_pinning: CpuPinning) {
    // Unsupported platforms are reported once at pool construction.
}
