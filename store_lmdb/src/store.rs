//! The LMDB-backed ledger store.

use std::path::PathBuf;
use std::sync::Arc;

use fedchain_store::{
    BackendConfig, Connection, LedgerStore, RetryPolicy, StoreBackend, StoreError, StoreFactory,
};

use crate::integrity::{check_integrity, IntegrityReport};
use crate::{LmdbConnector, LmdbEnvironment};

/// Ledger store over a lazily opened LMDB environment.
///
/// Every query goes through [`Connection::run`], so the environment is
/// opened (and migrated) on first use and reopened if opening failed.
pub struct LmdbStore {
    pub(crate) conn: Connection<LmdbConnector>,
}

impl LmdbStore {
    pub fn new(path: impl Into<PathBuf>, map_size: usize, retry: RetryPolicy) -> Self {
        Self {
            conn: Connection::new(LmdbConnector::new(path, map_size), retry),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.data_dir.clone(), config.lmdb_map_size, config.retry)
    }

    /// Registry factory for [`fedchain_store::BackendKind::Lmdb`].
    pub fn factory() -> StoreFactory {
        Box::new(|config: &BackendConfig| Ok(Arc::new(Self::from_config(config)) as Arc<dyn LedgerStore>))
    }

    /// Count entries in every collection and collect read failures.
    pub fn integrity_report(&self) -> Result<IntegrityReport, StoreError> {
        self.conn
            .run(|env| check_integrity(env.env()).map_err(StoreError::from))
    }

    pub(crate) fn with_env<T>(
        &self,
        op: impl Fn(&LmdbEnvironment) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.conn.run(op)
    }
}

impl StoreBackend for LmdbStore {
    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}
