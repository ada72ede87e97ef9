//! Backend registry.
//!
//! Built once at startup, then passed to whatever needs to open a store.
//! Each backend kind maps to a factory producing a [`LedgerStore`]; the
//! store's trait methods are the per-operation dispatch.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{LedgerStore, RetryPolicy, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Lmdb,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lmdb => "lmdb",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lmdb" => Ok(Self::Lmdb),
            "memory" => Ok(Self::Memory),
            other => Err(StoreError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Everything a factory needs to open a backend.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub data_dir: PathBuf,
    pub lmdb_map_size: usize,
    pub retry: RetryPolicy,
}

pub type StoreFactory =
    Box<dyn Fn(&BackendConfig) -> Result<Arc<dyn LedgerStore>, StoreError> + Send + Sync>;

#[derive(Default)]
pub struct QueryRegistry {
    factories: HashMap<BackendKind, StoreFactory>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `kind`. Registering a kind twice is an error.
    pub fn register(&mut self, kind: BackendKind, factory: StoreFactory) -> Result<(), StoreError> {
        if self.factories.contains_key(&kind) {
            return Err(StoreError::DuplicateRegistration(kind.to_string()));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    pub fn is_registered(&self, kind: BackendKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Open a store for `config.kind`.
    pub fn open(&self, config: &BackendConfig) -> Result<Arc<dyn LedgerStore>, StoreError> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| StoreError::UnsupportedBackend(config.kind.to_string()))?;
        info!(backend = %config.kind, "opening ledger store");
        factory(config)
    }
}
