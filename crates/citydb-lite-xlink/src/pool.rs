// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Worker pool for resolution lanes

use citydb_lite_model::{Result, XlinkError};
use rayon::prelude::*;

/// Unit of work submitted to the pool
pub type Job<'a, T> = Box<dyn FnOnce() -> T + Send + 'a>;

/// Thread pool sized for I/O-bound database writes
///
/// [`run_all`](WorkerPool::run_all) submits a set of jobs and joins them:
/// it returns only after every job has completed, so the caller observes
/// the complete effect of the submitted work.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Create a pool with the given number of threads
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("xlink-worker-{}", i))
            .build()
            .map_err(|e| XlinkError::other(format!("cannot start worker pool: {}", e)))?;

        Ok(Self { pool, threads })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run all jobs on the pool and wait for them
    ///
    /// Results are returned in submission order.
    pub fn run_all<'a, T: Send>(&self, jobs: Vec<Job<'a, T>>) -> Vec<T> {
        self.pool
            .install(|| jobs.into_par_iter().map(|job| job()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_results_keep_submission_order() {
        let pool = WorkerPool::new(3).unwrap();
        let jobs: Vec<Job<'_, usize>> = (0usize..8)
            .map(|i| Box::new(move || i * 10) as Job<'_, usize>)
            .collect();
        assert_eq!(pool.run_all(jobs), vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn test_join_waits_for_borrowed_work() {
        let pool = WorkerPool::new(2).unwrap();
        let counter = AtomicUsize::new(0);
        let jobs: Vec<Job<'_, ()>> = (0..16)
            .map(|_| {
                Box::new(|| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Job<'_, ()>
            })
            .collect();
        pool.run_all(jobs);
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_zero_threads_is_one() {
        assert_eq!(WorkerPool::new(0).unwrap().threads(), 1);
    }
}
