//! Backlog storage trait.

use crate::{unsupported, QueryIter, StoreBackend, StoreError};
use fedchain_types::{Assignment, BacklogEntry, Timestamp, Transaction, TxId};

/// Conditional reassignment of a backlog entry.
///
/// The update applies only if the stored assignment still equals `expected`,
/// so a late writer holding an old view cannot undo a newer reassignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BacklogUpdate {
    pub expected: Assignment,
    pub assignment: Assignment,
}

/// Pending transactions awaiting inclusion in a block.
pub trait BacklogStore: StoreBackend {
    /// Insert `entry` unless a record with the same id exists.
    ///
    /// Returns `true` if this call wrote the record. A duplicate is a no-op,
    /// never an error.
    fn write_transaction(&self, entry: &BacklogEntry) -> Result<bool, StoreError> {
        let _ = entry;
        Err(unsupported(self, "write_transaction"))
    }

    /// Apply `update` to the entry for `id`. Returns the updated entry, or
    /// `None` when the id is absent or the stored assignment has moved on.
    fn update_transaction(
        &self,
        id: &TxId,
        update: &BacklogUpdate,
    ) -> Result<Option<BacklogEntry>, StoreError> {
        let _ = (id, update);
        Err(unsupported(self, "update_transaction"))
    }

    /// Delete the given ids, returning how many records were removed.
    fn delete_transactions(&self, ids: &[TxId]) -> Result<usize, StoreError> {
        let _ = ids;
        Err(unsupported(self, "delete_transactions"))
    }

    /// Entries whose assignment is older than `now - reassign_delay_secs`.
    fn get_stale_transactions(
        &self,
        reassign_delay_secs: u64,
        now: Timestamp,
    ) -> Result<QueryIter<BacklogEntry>, StoreError> {
        let _ = (reassign_delay_secs, now);
        Err(unsupported(self, "get_stale_transactions"))
    }

    /// The pending transaction with its assignment stripped.
    fn get_transaction_from_backlog(&self, id: &TxId) -> Result<Option<Transaction>, StoreError> {
        let _ = id;
        Err(unsupported(self, "get_transaction_from_backlog"))
    }

    fn count_backlog(&self) -> Result<u64, StoreError> {
        Err(unsupported(self, "count_backlog"))
    }
}
