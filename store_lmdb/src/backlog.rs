//! LMDB implementation of BacklogStore.
//!
//! Entries live in `backlog` keyed by tx id. `backlog_by_time` mirrors each
//! entry under `assignment_timestamp_be ++ tx_id` so the staleness sweep
//! reads only the entries it returns.

use fedchain_store::{BacklogStore, BacklogUpdate, QueryIter, StoreError};
use fedchain_types::{BacklogEntry, Timestamp, Transaction, TxId};

use crate::codec::{backlog_time_key, from_json, to_json, trailing_id};
use crate::cursor::Cursor;
use crate::{LmdbError, LmdbStore};

impl BacklogStore for LmdbStore {
    fn write_transaction(&self, entry: &BacklogEntry) -> Result<bool, StoreError> {
        let id = entry.id();
        let bytes = to_json(entry)?;
        self.with_env(|env| {
            let mut wtxn = env.env.write_txn().map_err(LmdbError::from)?;
            if env
                .backlog_db
                .get(&wtxn, id.as_bytes())
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Ok(false);
            }
            env.backlog_db
                .put(&mut wtxn, id.as_bytes(), &bytes)
                .map_err(LmdbError::from)?;
            let time_key = backlog_time_key(entry.assignment.assignment_timestamp, &id);
            env.backlog_by_time_db
                .put(&mut wtxn, &time_key, &[])
                .map_err(LmdbError::from)?;
            wtxn.commit().map_err(LmdbError::from)?;
            Ok(true)
        })
    }

    fn update_transaction(
        &self,
        id: &TxId,
        update: &BacklogUpdate,
    ) -> Result<Option<BacklogEntry>, StoreError> {
        self.with_env(|env| {
            let mut wtxn = env.env.write_txn().map_err(LmdbError::from)?;
            let mut entry: BacklogEntry = match env
                .backlog_db
                .get(&wtxn, id.as_bytes())
                .map_err(LmdbError::from)?
            {
                Some(bytes) => from_json(bytes)?,
                None => return Ok(None),
            };
            if entry.assignment != update.expected {
                return Ok(None);
            }

            let old_key = backlog_time_key(entry.assignment.assignment_timestamp, id);
            env.backlog_by_time_db
                .delete(&mut wtxn, &old_key)
                .map_err(LmdbError::from)?;

            entry.assignment = update.assignment;
            let bytes = to_json(&entry)?;
            env.backlog_db
                .put(&mut wtxn, id.as_bytes(), &bytes)
                .map_err(LmdbError::from)?;
            let new_key = backlog_time_key(entry.assignment.assignment_timestamp, id);
            env.backlog_by_time_db
                .put(&mut wtxn, &new_key, &[])
                .map_err(LmdbError::from)?;
            wtxn.commit().map_err(LmdbError::from)?;
            Ok(Some(entry))
        })
    }

    fn delete_transactions(&self, ids: &[TxId]) -> Result<usize, StoreError> {
        self.with_env(|env| {
            let mut wtxn = env.env.write_txn().map_err(LmdbError::from)?;
            let mut deleted = 0;
            for id in ids {
                let timestamp = match env
                    .backlog_db
                    .get(&wtxn, id.as_bytes())
                    .map_err(LmdbError::from)?
                {
                    Some(bytes) => from_json::<BacklogEntry>(bytes)?.assignment.assignment_timestamp,
                    None => continue,
                };
                env.backlog_db
                    .delete(&mut wtxn, id.as_bytes())
                    .map_err(LmdbError::from)?;
                env.backlog_by_time_db
                    .delete(&mut wtxn, &backlog_time_key(timestamp, id))
                    .map_err(LmdbError::from)?;
                deleted += 1;
            }
            wtxn.commit().map_err(LmdbError::from)?;
            Ok(deleted)
        })
    }

    fn get_stale_transactions(
        &self,
        reassign_delay_secs: u64,
        now: Timestamp,
    ) -> Result<QueryIter<BacklogEntry>, StoreError> {
        let cutoff = now.minus_secs(reassign_delay_secs);
        let end = cutoff.as_secs().to_be_bytes().to_vec();
        self.with_env(|env| {
            let backlog_db = env.backlog_db;
            let cursor = Cursor::new(
                env.clone(),
                env.backlog_by_time_db,
                Vec::new(),
                Some(end.clone()),
                move |_, rtxn, key, _| {
                    let id = trailing_id(key)?;
                    match backlog_db.get(rtxn, &id)? {
                        Some(bytes) => Ok(Some(from_json::<BacklogEntry>(bytes)?)),
                        // Deleted between index read and lookup.
                        None => Ok(None),
                    }
                },
            );
            Ok(Box::new(cursor) as QueryIter<BacklogEntry>)
        })
    }

    fn get_transaction_from_backlog(&self, id: &TxId) -> Result<Option<Transaction>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let entry = match env
                .backlog_db
                .get(&rtxn, id.as_bytes())
                .map_err(LmdbError::from)?
            {
                Some(bytes) => Some(from_json::<BacklogEntry>(bytes)?),
                None => None,
            };
            Ok(entry.map(|e| e.transaction))
        })
    }

    fn count_backlog(&self) -> Result<u64, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let count = env.backlog_db.len(&rtxn).map_err(LmdbError::from)?;
            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedchain_store::RetryPolicy;
    use fedchain_types::{Assignment, Asset, Operation, PublicKey, TX_VERSION};

    fn store(dir: &tempfile::TempDir) -> LmdbStore {
        LmdbStore::new(dir.path(), 1 << 24, RetryPolicy::immediate(1))
    }

    fn entry(seed: u8, assignee: u8, at: u64) -> BacklogEntry {
        BacklogEntry {
            transaction: Transaction {
                id: TxId::new([seed; 32]),
                version: TX_VERSION.into(),
                operation: Operation::Create,
                inputs: vec![],
                outputs: vec![],
                asset: Asset::default(),
                metadata: None,
            },
            assignment: Assignment {
                assignee: PublicKey([assignee; 32]),
                assignment_timestamp: Timestamp::new(at),
            },
        }
    }

    #[test]
    fn write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.write_transaction(&entry(1, 1, 10)).unwrap());
        assert!(!store.write_transaction(&entry(1, 2, 99)).unwrap());
        assert_eq!(store.count_backlog().unwrap(), 1);
        let stale: Vec<_> = store
            .get_stale_transactions(0, Timestamp::new(100))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].assignment.assignee, PublicKey([1; 32]));
    }

    #[test]
    fn stale_query_respects_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.write_transaction(&entry(1, 1, 10)).unwrap();
        store.write_transaction(&entry(2, 1, 50)).unwrap();
        store.write_transaction(&entry(3, 1, 90)).unwrap();

        store.write_transaction(&entry(4, 1, 60)).unwrap();

        // Cutoff is 60; strictly older entries are stale.
        let ids: Vec<TxId> = store
            .get_stale_transactions(40, Timestamp::new(100))
            .unwrap()
            .map(|r| r.unwrap().id())
            .collect();
        assert_eq!(ids, vec![TxId::new([1; 32]), TxId::new([2; 32])]);
    }

    #[test]
    fn stale_scan_over_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(
            store
                .get_stale_transactions(0, Timestamp::new(100))
                .unwrap()
                .count(),
            0
        );

        store.write_transaction(&entry(1, 1, 0)).unwrap();
        let stale: Vec<BacklogEntry> = store
            .get_stale_transactions(0, Timestamp::new(100))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(stale, vec![entry(1, 1, 0)]);
    }

    #[test]
    fn racing_writers_store_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store(&dir));

        let handles: Vec<_> = (0..8u8)
            .map(|assignee| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || store.write_transaction(&entry(1, assignee, 10)))
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .filter(|fresh| *fresh)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(store.count_backlog().unwrap(), 1);
        assert_eq!(
            store
                .get_stale_transactions(0, Timestamp::new(100))
                .unwrap()
                .count(),
            1
        );
    }

    #[test]
    fn compare_and_swap_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let original = entry(1, 1, 10);
        store.write_transaction(&original).unwrap();

        let next = Assignment {
            assignee: PublicKey([2; 32]),
            assignment_timestamp: Timestamp::new(200),
        };
        let update = BacklogUpdate {
            expected: original.assignment,
            assignment: next,
        };
        let updated = store.update_transaction(&original.id(), &update).unwrap().unwrap();
        assert_eq!(updated.assignment, next);

        // A second writer holding the old view loses.
        assert!(store.update_transaction(&original.id(), &update).unwrap().is_none());
        // The time index followed the update.
        assert_eq!(
            store
                .get_stale_transactions(0, Timestamp::new(150))
                .unwrap()
                .count(),
            0
        );
        assert!(store
            .update_transaction(&TxId::new([9; 32]), &update)
            .unwrap()
            .is_none());
    }

    #[test]
    fn delete_counts_only_present_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.write_transaction(&entry(1, 1, 10)).unwrap();
        store.write_transaction(&entry(2, 1, 10)).unwrap();
        let deleted = store
            .delete_transactions(&[TxId::new([1; 32]), TxId::new([7; 32])])
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count_backlog().unwrap(), 1);
        assert!(store
            .get_transaction_from_backlog(&TxId::new([1; 32]))
            .unwrap()
            .is_none());
        assert!(store
            .get_transaction_from_backlog(&TxId::new([2; 32]))
            .unwrap()
            .is_some());
    }
}
