//! Connectors for the in-memory backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use fedchain_store::{Connector, StoreError};

use crate::MemoryDb;

/// Hands out the same shared in-memory database on every connect.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    db: Arc<MemoryDb>,
}

impl MemoryConnector {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

impl Connector for MemoryConnector {
    type Handle = Arc<MemoryDb>;

    fn connect(&self) -> Result<Arc<MemoryDb>, StoreError> {
        Ok(self.db.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Wraps a connector and refuses the first `failures` connects.
///
/// Used to exercise retry and backoff paths without a real outage.
pub struct FlakyConnector<C> {
    inner: C,
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl<C> FlakyConnector<C> {
    pub fn new(inner: C, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }

    /// Total connect calls so far, failed or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Make the next `n` connects fail.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }
}

impl<C: Connector> Connector for FlakyConnector<C> {
    type Handle = C::Handle;

    fn connect(&self) -> Result<C::Handle, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Connection(format!(
                "{} refused connection (injected)",
                self.inner.name()
            )));
        }
        self.inner.connect()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_then_recovers() {
        let flaky = FlakyConnector::new(MemoryConnector::default(), 2);
        assert!(flaky.connect().is_err());
        assert!(flaky.connect().is_err());
        assert!(flaky.connect().is_ok());
        assert_eq!(flaky.attempts(), 3);
        flaky.fail_next(1);
        assert!(flaky.connect().is_err());
    }
}
