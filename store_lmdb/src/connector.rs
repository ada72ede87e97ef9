use std::path::PathBuf;

use tracing::{info, warn};

use fedchain_store::{Connector, StoreError};

use crate::integrity::{check_data_dir, check_integrity};
use crate::{LmdbEnvironment, Migrator};

/// Opens the LMDB environment under a data directory.
///
/// Opening also brings the schema up to date and logs an integrity summary.
pub struct LmdbConnector {
    path: PathBuf,
    map_size: usize,
}

impl LmdbConnector {
    pub fn new(path: impl Into<PathBuf>, map_size: usize) -> Self {
        Self {
            path: path.into(),
            map_size,
        }
    }
}

impl Connector for LmdbConnector {
    type Handle = LmdbEnvironment;

    fn connect(&self) -> Result<LmdbEnvironment, StoreError> {
        check_data_dir(&self.path).map_err(StoreError::Corruption)?;
        let env = LmdbEnvironment::open(&self.path, self.map_size)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Migrator::run(&env)?;

        let report = check_integrity(env.env())?;
        if report.is_healthy() {
            info!(
                path = %self.path.display(),
                databases = report.databases_checked,
                entries = report.total_entries,
                "LMDB environment opened"
            );
        } else {
            warn!(path = %self.path.display(), errors = ?report.errors, "LMDB integrity check reported errors");
        }
        Ok(env)
    }

    fn name(&self) -> &'static str {
        "lmdb"
    }
}
