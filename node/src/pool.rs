//! Bounded pool of blocking store workers.
//!
//! Store queries block on disk or on connection retries, so each one runs on
//! tokio's blocking thread pool. A semaphore caps how many run at once; no
//! worker holds a permit across requests.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::NodeError;

#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running job.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run `f` on a blocking worker once a permit is free.
    pub async fn run<F, R>(&self, f: F) -> Result<R, NodeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| NodeError::Other("worker pool closed".into()))?;
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| NodeError::Other(format!("worker task failed: {e}")))
    }
}
