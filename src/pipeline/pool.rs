//! Bounded worker pool used for the extraction and persistence phases.

use std::future::Future;

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};

/// Runs jobs as independent tokio tasks, at most `workers` at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Size the pool to the host, leaving `reserved` cores free (at least one worker).
    pub fn for_host(reserved: usize) -> Self {
        Self::new(num_cpus::get().saturating_sub(reserved))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job to completion and return outcomes in input order. Returning
    /// is the join barrier: no outcome is observed until all jobs have finished.
    /// A job that fails or panics yields an `Err` in its own slot only.
    pub async fn run_all<I, T, F, Fut>(&self, items: Vec<I>, job: F) -> Vec<Result<T>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        stream::iter(items.into_iter().map(|item| tokio::spawn(job(item))))
            .buffered(self.workers)
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(err) => Err(anyhow!("worker task aborted: {err}")),
            })
            .collect()
            .await
    }
}
