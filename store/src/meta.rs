//! Metadata storage trait.

use crate::{unsupported, StoreBackend, StoreError};

pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Internal bookkeeping that belongs to no ledger collection.
pub trait MetaStore: StoreBackend {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let _ = (key, value);
        Err(unsupported(self, "put_meta"))
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let _ = key;
        Err(unsupported(self, "get_meta"))
    }

    /// Stored schema version; 0 when never written.
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta(SCHEMA_VERSION_KEY)? {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!("schema version has {} bytes", bytes.len()))
                })?;
                Ok(u32::from_be_bytes(arr))
            }
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_be_bytes())
    }
}
