//! The storage port: lazy connection management with bounded retries.
//!
//! A [`Connector`] knows how to open one backend handle. [`Connection`]
//! opens it on first use, retries failed attempts with exponential backoff,
//! and reconnects once when a handle fails mid-query.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use crate::StoreError;

/// Attempt budget and backoff schedule for connecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connection attempts per cycle. Always at least one.
    pub max_tries: u32,
    /// Wait after the `n`th failed attempt (counting from 1) is
    /// `backoff_base * 2^n`, so the first retry waits twice the base.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_tries: u32, backoff_base: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            backoff_base,
        }
    }

    /// No waiting between attempts. For tests.
    pub fn immediate(max_tries: u32) -> Self {
        Self::new(max_tries, Duration::ZERO)
    }

    /// Wait after `failures` consecutive failed attempts.
    pub fn delay(&self, failures: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32.checked_shl(failures).unwrap_or(u32::MAX))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Opens backend handles. Handles are cheap to clone and shared by callers.
pub trait Connector: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    fn connect(&self) -> Result<Self::Handle, StoreError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// A lazily opened, self-healing connection.
pub struct Connection<C: Connector> {
    connector: C,
    policy: RetryPolicy,
    handle: Mutex<Option<C::Handle>>,
}

impl<C: Connector> Connection<C> {
    /// Creates the connection without touching the backend.
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            handle: Mutex::new(None),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_connected(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// The current handle, connecting first if needed. Idempotent.
    ///
    /// Makes up to `max_tries` attempts, sleeping [`RetryPolicy::delay`]
    /// between them: `2b`, `4b`, `8b`, ... for a backoff base `b`.
    pub fn connect(&self) -> Result<C::Handle, StoreError> {
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }

        let max_tries = self.policy.max_tries;
        let mut last_err = None;
        for attempt in 0..max_tries {
            debug!(backend = self.connector.name(), attempt, max_tries, "connecting");
            match self.connector.connect() {
                Ok(handle) => {
                    *slot = Some(handle.clone());
                    return Ok(handle);
                }
                Err(e) => {
                    warn!(backend = self.connector.name(), attempt, max_tries, error = %e, "connection attempt failed");
                    last_err = Some(e);
                    if attempt + 1 < max_tries {
                        std::thread::sleep(self.policy.delay(attempt + 1));
                    }
                }
            }
        }

        Err(StoreError::Connection(format!(
            "{} unreachable after {} attempts: {}",
            self.connector.name(),
            max_tries,
            last_err.map_or_else(|| "no attempt made".to_string(), |e| e.to_string())
        )))
    }

    /// Drop the current handle so the next call reconnects.
    pub fn reset(&self) {
        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Run `op` against a live handle.
    ///
    /// A connectivity failure from `op` discards the handle and grants one
    /// more full connect-and-run cycle. Other errors return immediately.
    pub fn run<T>(&self, op: impl Fn(&C::Handle) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let handle = self.connect()?;
        match op(&handle) {
            Err(e) if e.is_connectivity() => {
                warn!(backend = self.connector.name(), error = %e, "query lost its connection, reconnecting");
                self.reset();
                let handle = self.connect()?;
                op(&handle)
            }
            other => other,
        }
    }
}
