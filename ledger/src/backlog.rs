//! Pending-transaction lifecycle: insert with a random assignee, reassign
//! when the assignee stalls, delete once a block includes the transaction.

use std::sync::{Arc, Mutex};

use fedchain_store::{BacklogUpdate, LedgerStore};
use fedchain_types::{Assignment, BacklogEntry, Block, PublicKey, Timestamp, Transaction};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};

use crate::LedgerError;

/// Outcome of one reassignment sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReassignReport {
    pub examined: usize,
    pub reassigned: usize,
    /// Entries another writer reassigned or deleted between read and update.
    pub lost_race: usize,
}

pub struct BacklogManager {
    store: Arc<dyn LedgerStore>,
    federation: Vec<PublicKey>,
    reassign_delay_secs: u64,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl BacklogManager {
    pub fn new(store: Arc<dyn LedgerStore>, federation: Vec<PublicKey>, reassign_delay_secs: u64) -> Self {
        Self::with_rng(store, federation, reassign_delay_secs, StdRng::from_entropy())
    }

    pub fn with_rng(
        store: Arc<dyn LedgerStore>,
        federation: Vec<PublicKey>,
        reassign_delay_secs: u64,
        rng: impl RngCore + Send + 'static,
    ) -> Self {
        Self {
            store,
            federation,
            reassign_delay_secs,
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn federation(&self) -> &[PublicKey] {
        &self.federation
    }

    pub fn reassign_delay_secs(&self) -> u64 {
        self.reassign_delay_secs
    }

    /// Pick a federation member, skipping `exclude` when anyone else is left.
    fn pick_assignee(&self, exclude: Option<&PublicKey>) -> Option<PublicKey> {
        let others: Vec<PublicKey> = self
            .federation
            .iter()
            .filter(|k| Some(*k) != exclude)
            .copied()
            .collect();
        let pool = if others.is_empty() { &self.federation } else { &others };
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        pool.choose(&mut *rng).copied()
    }

    /// Put `tx` in the backlog with a random assignee.
    ///
    /// Returns `false` if the transaction was already pending.
    pub fn insert(&self, tx: Transaction, now: Timestamp) -> Result<bool, LedgerError> {
        let assignee = self.pick_assignee(None).ok_or(LedgerError::EmptyFederation)?;
        let entry = BacklogEntry {
            transaction: tx,
            assignment: Assignment {
                assignee,
                assignment_timestamp: now,
            },
        };
        let written = self.store.write_transaction(&entry)?;
        if written {
            debug!(tx_id = %entry.id(), assignee = %assignee, "transaction queued");
        }
        Ok(written)
    }

    /// Hand every stale entry to a different federation member.
    pub fn reassign_stale(&self, now: Timestamp) -> Result<ReassignReport, LedgerError> {
        let mut report = ReassignReport::default();
        let stale: Vec<BacklogEntry> = self
            .store
            .get_stale_transactions(self.reassign_delay_secs, now)?
            .collect::<Result<_, _>>()?;

        for entry in stale {
            report.examined += 1;
            let Some(assignee) = self.pick_assignee(Some(&entry.assignment.assignee)) else {
                continue;
            };
            let update = BacklogUpdate {
                expected: entry.assignment,
                assignment: Assignment {
                    assignee,
                    assignment_timestamp: now,
                },
            };
            match self.store.update_transaction(&entry.id(), &update)? {
                Some(_) => {
                    report.reassigned += 1;
                    info!(
                        tx_id = %entry.id(),
                        from = %entry.assignment.assignee,
                        to = %assignee,
                        "reassigned stale transaction"
                    );
                }
                None => report.lost_race += 1,
            }
        }
        Ok(report)
    }

    /// Drop the block's transactions from the backlog.
    pub fn complete(&self, block: &Block) -> Result<usize, LedgerError> {
        let ids: Vec<_> = block.tx_ids().collect();
        let removed = self.store.delete_transactions(&ids)?;
        debug!(block_id = %block.id, removed, "backlog entries completed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_block;
    use fedchain_crypto::keypair_from_seed;
    use fedchain_nullables::{NullClock, NullRandom, NullStore};
    use fedchain_store::BacklogStore;
    use fedchain_transactions::{create, OutputSpec};
    use fedchain_types::{Clock, KeyPair};

    fn federation() -> Vec<KeyPair> {
        (1..=3).map(|i| keypair_from_seed(&[i; 32])).collect()
    }

    fn sample_tx(owner: &KeyPair, n: u64) -> Transaction {
        let tx = create(
            vec![owner.public],
            vec![OutputSpec::new(vec![owner.public], n)],
            None,
            None,
        )
        .unwrap();
        fedchain_transactions::sign_transaction(tx, &[owner])
    }

    fn manager(fed: &[KeyPair], store: Arc<NullStore>) -> BacklogManager {
        BacklogManager::with_rng(
            store,
            fed.iter().map(|k| k.public).collect(),
            30,
            NullRandom::constant(0),
        )
    }

    #[test]
    fn insert_assigns_and_dedups() {
        let fed = federation();
        let store = Arc::new(NullStore::new());
        let backlog = manager(&fed, store.clone());
        let tx = sample_tx(&fed[0], 1);

        assert!(backlog.insert(tx.clone(), Timestamp::new(100)).unwrap());
        assert!(!backlog.insert(tx.clone(), Timestamp::new(200)).unwrap());
        assert_eq!(store.count_backlog().unwrap(), 1);

        let stale: Vec<_> = store
            .get_stale_transactions(0, Timestamp::new(101))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(stale[0].assignment.assignee, fed[0].public);
        assert_eq!(stale[0].assignment.assignment_timestamp, Timestamp::new(100));
    }

    #[test]
    fn stale_entries_move_to_another_node() {
        let fed = federation();
        let clock = NullClock::new(1_000);
        let store = Arc::new(NullStore::new());
        let backlog = manager(&fed, store.clone());
        backlog.insert(sample_tx(&fed[0], 1), clock.now()).unwrap();

        assert_eq!(backlog.reassign_stale(clock.now()).unwrap().examined, 0);

        clock.advance(31);
        let report = backlog.reassign_stale(clock.now()).unwrap();
        assert_eq!(report.reassigned, 1);

        let entries: Vec<_> = store
            .get_stale_transactions(0, Timestamp::new(clock.now().as_secs() + 1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries[0].assignment.assignee, fed[1].public);
        assert_eq!(entries[0].assignment.assignment_timestamp, clock.now());
    }

    #[test]
    fn single_node_federation_keeps_its_assignee() {
        let fed = federation();
        let store = Arc::new(NullStore::new());
        let backlog = manager(&fed[..1], store.clone());
        backlog.insert(sample_tx(&fed[0], 1), Timestamp::new(0)).unwrap();
        let report = backlog.reassign_stale(Timestamp::new(100)).unwrap();
        assert_eq!(report.reassigned, 1);
    }

    #[test]
    fn complete_removes_block_transactions() {
        let fed = federation();
        let store = Arc::new(NullStore::new());
        let backlog = manager(&fed, store.clone());
        let a = sample_tx(&fed[0], 1);
        let b = sample_tx(&fed[0], 2);
        backlog.insert(a.clone(), Timestamp::new(1)).unwrap();
        backlog.insert(b, Timestamp::new(1)).unwrap();

        let block = create_block(vec![a], &fed[0], vec![fed[0].public], Timestamp::new(2)).unwrap();
        assert_eq!(backlog.complete(&block).unwrap(), 1);
        assert_eq!(store.count_backlog().unwrap(), 1);
    }
}
