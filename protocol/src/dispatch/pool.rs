//! # Worker Pool
//!
//! Fixed-size concurrent execution capacity for message-processing jobs.
//! Implemented as a counting semaphore over `tokio::spawn`: `submit` waits
//! for a free slot, then launches the job as its own task holding the
//! permit. At most `size` jobs run at once; everything beyond that waits in
//! `submit`, which keeps the dispatch loop's submission order equal to its
//! dequeue order.
//!
//! There is no per-job deadline. A handler that never returns occupies its
//! slot forever — an accepted limitation of this layer, not a liveness
//! guarantee.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Bounded-concurrency job runner.
///
/// Cloning is cheap and clones share the same capacity, so the pool handle
/// can be handed to the dispatch loop and to tests alike.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `size` jobs concurrently.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Number of concurrent job slots.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Job slots currently free. Mostly useful in tests and diagnostics.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Submits a job, waiting for a free slot first.
    ///
    /// Returns once the job has been handed to the runtime — not once it
    /// completes. Jobs run fully independently of each other and of the
    /// caller; completion order is unspecified.
    pub async fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // The semaphore is never closed, so acquisition only fails if the
        // pool itself is gone — in which case there is nobody to run for.
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            return;
        };
        tokio::spawn(async move {
            job.await;
            drop(permit);
        });
    }

    /// Waits until every in-flight job has finished.
    ///
    /// Used at shutdown so no handler is abandoned mid-message. New `submit`
    /// calls racing this will interleave; the orchestrator stops the
    /// dispatch loop before quiescing.
    pub async fn quiesce(&self) {
        if let Ok(all) = self.permits.acquire_many(self.size as u32).await {
            drop(all);
        }
    }
}
