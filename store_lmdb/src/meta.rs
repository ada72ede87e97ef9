//! LMDB implementation of MetaStore, delegating to the live environment.

use fedchain_store::{MetaStore, StoreError};

use crate::LmdbStore;

impl MetaStore for LmdbStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.with_env(|env| env.put_meta(key, value))
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_env(|env| env.get_meta(key))
    }
}
