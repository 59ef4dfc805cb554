//! # Worker Pool
//!
//! A fixed number of scoped threads drain a shared queue of work units.
//! The pool is a plain value owned by one verification or write call;
//! nothing outlives the call. Joining the scope is the barrier: when
//! [`WorkerPool::run`] returns, every dispatched unit has finished.
//!
//! ## Cancellation
//!
//! Workers check a caller-held flag before taking each unit. Setting it
//! stops new units from starting; units already running complete.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Counts reported after a pool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Units that ran.
    pub completed: usize,
    /// Units never started because the run was cancelled.
    pub skipped: usize,
}

/// Bounded set of worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: NonZeroUsize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            workers: default_parallelism(),
        }
    }
}

fn default_parallelism() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

impl WorkerPool {
    /// A pool with `workers` threads; zero means the machine's parallelism.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: NonZeroUsize::new(workers).unwrap_or_else(default_parallelism),
        }
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Run `work` over every unit and wait for all of them.
    pub fn run<T, F>(&self, units: Vec<T>, cancel: &AtomicBool, work: F) -> PoolStats
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        self.run_with(units, cancel, work, || ()).0
    }

    /// Like [`run`](Self::run), while `coordinator` runs on the calling
    /// thread at the same time. Returns the coordinator's result once both
    /// the coordinator and every worker are done.
    pub fn run_with<T, F, C, R>(
        &self,
        units: Vec<T>,
        cancel: &AtomicBool,
        work: F,
        coordinator: C,
    ) -> (PoolStats, R)
    where
        T: Send,
        F: Fn(T) + Sync,
        C: FnOnce() -> R,
    {
        let total = units.len();
        let threads = self.workers.get().min(total);
        let queue = Mutex::new(VecDeque::from(units));
        let completed = AtomicUsize::new(0);

        let result = std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| loop {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let unit = queue.lock().pop_front();
                    match unit {
                        Some(unit) => {
                            work(unit);
                            completed.fetch_add(1, Ordering::Relaxed);
                        }
                        None => break,
                    }
                });
            }
            coordinator()
        });

        let completed = completed.into_inner();
        let stats = PoolStats {
            completed,
            skipped: total - completed,
        };
        if stats.skipped > 0 {
            tracing::warn!(skipped = stats.skipped, "worker pool run cancelled");
        }
        (stats, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashSet;

    #[test]
    fn every_unit_runs_exactly_once() {
        let pool = WorkerPool::new(4);
        let seen = DashSet::new();
        let cancel = AtomicBool::new(false);
        let stats = pool.run((0..500).collect(), &cancel, |i: u32| {
            assert!(seen.insert(i), "unit {i} ran twice");
        });
        assert_eq!(stats.completed, 500);
        assert_eq!(stats.skipped, 0);
        assert_eq!(seen.len(), 500);
    }

    #[test]
    fn empty_queue_is_fine() {
        let pool = WorkerPool::new(3);
        let stats = pool.run(Vec::<u8>::new(), &AtomicBool::new(false), |_| {});
        assert_eq!(stats, PoolStats::default());
    }

    #[test]
    fn zero_workers_falls_back_to_parallelism() {
        assert!(WorkerPool::new(0).workers() >= 1);
        assert_eq!(WorkerPool::new(2).workers(), 2);
    }

    #[test]
    fn pre_cancelled_run_starts_nothing() {
        let pool = WorkerPool::new(2);
        let cancel = AtomicBool::new(true);
        let stats = pool.run(vec![1, 2, 3], &cancel, |_| panic!("should not run"));
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.skipped, 3);
    }

    #[test]
    fn cancelling_mid_run_skips_remaining_units() {
        let pool = WorkerPool::new(1);
        let cancel = AtomicBool::new(false);
        let ran = AtomicUsize::new(0);
        let stats = pool.run((0..10).collect(), &cancel, |i: u32| {
            ran.fetch_add(1, Ordering::SeqCst);
            if i == 2 {
                cancel.store(true, Ordering::SeqCst);
            }
        });
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.skipped, 7);
        assert_eq!(ran.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn coordinator_runs_alongside_workers() {
        let pool = WorkerPool::new(2);
        let cancel = AtomicBool::new(false);
        let sum = AtomicUsize::new(0);
        let (stats, answer) = pool.run_with(
            (1..=10).collect(),
            &cancel,
            |i: usize| {
                sum.fetch_add(i, Ordering::SeqCst);
            },
            || 42,
        );
        assert_eq!(stats.completed, 10);
        assert_eq!(answer, 42);
        assert_eq!(sum.load(Ordering::SeqCst), 55);
    }
}
