//! Fork/join execution over contiguous index ranges.
//!
//! Every parallel step of the engine has the same shape: split `0..total` into one
//! contiguous range per worker, run a task on each range, wait for all of them and merge
//! their outputs in range order. Tasks never share mutable state; if any task fails the
//! whole step fails and no partial output is returned.

use std::ops::Range;

use crate::error::{ConfigError, Error, Result};

pub struct Partitioner {
    workers: usize,
    #[cfg(feature = "rayon")]
    pool: rayon::ThreadPool,
}

impl Partitioner {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers.into());
        }

        #[cfg(feature = "rayon")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("scf-worker-{index}"))
            .build()
            .map_err(|err| Error::WorkerPool(err.to_string()))?;

        log::debug!("created partitioner with {workers} workers");

        Ok(Self {
            workers,
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    /// One worker per available cpu
    pub fn with_available_parallelism() -> Result<Self> {
        Self::new(
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Splits `0..total` into at most `workers` contiguous, non-overlapping ranges.
    pub fn partition(&self, total: usize) -> Vec<Range<usize>> {
        if total == 0 {
            return Vec::new();
        }

        let chunk = total.div_ceil(self.workers);
        (0..total)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(total))
            .collect()
    }

    /// Runs `task` once per range of [`partition`](Self::partition) and returns the results in
    /// range order once every task has finished.
    pub fn fork_join<T, F>(&self, total: usize, task: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(Range<usize>) -> Result<T> + Send + Sync,
    {
        let ranges = self.partition(total);
        log::trace!("fork/join over {total} items: {ranges:?}");

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;

            self.pool
                .install(|| ranges.into_par_iter().map(&task).collect::<Result<Vec<_>>>())
        }

        #[cfg(not(feature = "rayon"))]
        {
            ranges.into_iter().map(task).collect()
        }
    }
}

impl std::fmt::Debug for Partitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partitioner")
            .field("workers", &self.workers)
            .finish()
    }
}
