//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use fedchain_store::{MetaStore, StoreBackend, StoreError};

use crate::LmdbError;

pub(crate) const BACKLOG: &str = "backlog";
pub(crate) const BACKLOG_BY_TIME: &str = "backlog_by_time";
pub(crate) const BIGCHAIN: &str = "bigchain";
pub(crate) const TX_BLOCKS: &str = "tx_blocks";
pub(crate) const VOTES: &str = "votes";
pub(crate) const VOTES_BY_VOTER: &str = "votes_by_voter";
pub(crate) const META: &str = "meta";

pub(crate) const ALL_DATABASES: &[&str] = &[
    BACKLOG,
    BACKLOG_BY_TIME,
    BIGCHAIN,
    TX_BLOCKS,
    VOTES,
    VOTES_BY_VOTER,
    META,
];

/// Wraps the LMDB environment and all database handles. Cheap to clone.
#[derive(Clone)]
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    /// tx_id -> JSON `BacklogEntry`
    pub(crate) backlog_db: Database<Bytes, Bytes>,
    /// assignment_timestamp_be ++ tx_id -> ()
    pub(crate) backlog_by_time_db: Database<Bytes, Bytes>,
    /// block_id -> JSON `Block`
    pub(crate) bigchain_db: Database<Bytes, Bytes>,
    /// tx_id ++ block_id -> ()
    pub(crate) tx_blocks_db: Database<Bytes, Bytes>,
    /// block_id ++ voter -> bincode `Vote`
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// voter ++ block_id -> ()
    pub(crate) votes_by_voter_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("create {}: {e}", path.display())))?;

        // SAFETY: each data directory is opened by a single environment per
        // process, and the map is never truncated while in use.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(ALL_DATABASES.len() as u32)
                .open(path)
        }?;

        let mut wtxn = env.write_txn()?;
        let mut create = |name: &str| env.create_database::<Bytes, Bytes>(&mut wtxn, Some(name));
        let backlog_db = create(BACKLOG)?;
        let backlog_by_time_db = create(BACKLOG_BY_TIME)?;
        let bigchain_db = create(BIGCHAIN)?;
        let tx_blocks_db = create(TX_BLOCKS)?;
        let votes_db = create(VOTES)?;
        let votes_by_voter_db = create(VOTES_BY_VOTER)?;
        let meta_db = create(META)?;
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            backlog_db,
            backlog_by_time_db,
            bigchain_db,
            tx_blocks_db,
            votes_db,
            votes_by_voter_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }
}

impl StoreBackend for LmdbEnvironment {
    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}

impl MetaStore for LmdbEnvironment {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
            .map(<[u8]>::to_vec);
        Ok(value)
    }
}
