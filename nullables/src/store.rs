//! Nullable store: a complete in-memory ledger store.
//!
//! Where the LMDB backend scans blocks, this one keeps secondary indexes
//! (by asset, by spent output, by owner) updated on every block write.
//! Query results are resolved lazily from the shared tables.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fedchain_store::{
    matches_filters, BacklogStore, BacklogUpdate, BackendConfig, BlockStore, Connection,
    Connector, LedgerStore, MetaStore, QueryIter, RetryPolicy, StoreBackend, StoreError,
    StoreFactory, TransactionIndex, VecIter, VoteStore,
};
use fedchain_types::{
    Asset, BacklogEntry, Block, BlockId, BlockVoters, Operation, PublicKey, Timestamp,
    Transaction, TransactionLink, TxId, Vote,
};

use crate::{FlakyConnector, MemoryConnector};

/// Where an embedded transaction lives.
type Occurrence = (BlockId, TxId);

#[derive(Default)]
struct Tables {
    backlog: HashMap<TxId, BacklogEntry>,
    backlog_by_time: BTreeSet<(Timestamp, TxId)>,
    blocks: BTreeMap<BlockId, Block>,
    genesis: Option<BlockId>,
    tx_blocks: HashMap<TxId, Vec<BlockId>>,
    by_asset: HashMap<TxId, Vec<Occurrence>>,
    by_spent: HashMap<TransactionLink, Vec<Occurrence>>,
    by_owner: HashMap<PublicKey, Vec<Occurrence>>,
    votes: BTreeMap<(BlockId, PublicKey), Vote>,
    votes_by_voter: BTreeSet<(PublicKey, BlockId)>,
    meta: HashMap<String, Vec<u8>>,
}

impl Tables {
    fn resolve(&self, (block_id, tx_id): &Occurrence) -> Option<Transaction> {
        self.blocks.get(block_id)?.transaction(tx_id).cloned()
    }

    fn index_block(&mut self, block: &Block) {
        for tx in &block.block.transactions {
            let at = (block.id, tx.id);
            self.tx_blocks.entry(tx.id).or_default().push(block.id);
            if let Some(asset) = tx.asset_id() {
                self.by_asset.entry(asset).or_default().push(at);
            }
            for link in tx.spends() {
                self.by_spent.entry(*link).or_default().push(at);
            }
            let owners: BTreeSet<PublicKey> = tx
                .outputs
                .iter()
                .flat_map(|o| o.public_keys.iter().copied())
                .collect();
            for owner in owners {
                self.by_owner.entry(owner).or_default().push(at);
            }
        }
    }
}

/// Shared in-memory tables. One `MemoryDb` is one database.
#[derive(Default)]
pub struct MemoryDb {
    tables: RwLock<Tables>,
}

impl MemoryDb {
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resolves index hits one at a time, re-reading the tables on each step.
struct OccurrenceIter {
    db: Arc<MemoryDb>,
    hits: std::vec::IntoIter<Occurrence>,
}

impl Iterator for OccurrenceIter {
    type Item = Result<Transaction, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let tables = self.db.read();
        self.hits.by_ref().find_map(|hit| tables.resolve(&hit)).map(Ok)
    }
}

/// Walks blocks in id order, remembering the last id visited. `select`
/// sees the tables under the same read guard as the block.
struct BlockCursor<F> {
    db: Arc<MemoryDb>,
    last: Option<BlockId>,
    select: F,
}

impl<T, F: FnMut(&Tables, &Block) -> Option<T>> Iterator for BlockCursor<F> {
    type Item = Result<T, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let tables = self.db.read();
        let lower = match &self.last {
            Some(id) => Bound::Excluded(*id),
            None => Bound::Unbounded,
        };
        for (id, block) in tables.blocks.range((lower, Bound::Unbounded)) {
            self.last = Some(*id);
            if let Some(found) = (self.select)(&tables, block) {
                return Some(Ok(found));
            }
        }
        None
    }
}

/// In-memory ledger store for tests and the `memory` backend.
///
/// Generic over the connector so tests can inject connection failures
/// through [`FlakyConnector`].
pub struct NullStore<C: Connector<Handle = Arc<MemoryDb>> = MemoryConnector> {
    conn: Connection<C>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::with_connector(MemoryConnector::default(), RetryPolicy::immediate(1))
    }

    /// Registry factory for [`fedchain_store::BackendKind::Memory`].
    pub fn factory() -> StoreFactory {
        Box::new(|config: &BackendConfig| {
            Ok(Arc::new(NullStore::with_connector(MemoryConnector::default(), config.retry))
                as Arc<dyn LedgerStore>)
        })
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NullStore<FlakyConnector<MemoryConnector>> {
    /// A store whose first `failures` connection attempts are refused.
    pub fn flaky(failures: u32, retry: RetryPolicy) -> Self {
        Self::with_connector(FlakyConnector::new(MemoryConnector::default(), failures), retry)
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> NullStore<C> {
    pub fn with_connector(connector: C, retry: RetryPolicy) -> Self {
        Self {
            conn: Connection::new(connector, retry),
        }
    }

    pub fn connection(&self) -> &Connection<C> {
        &self.conn
    }

    fn with_db<T>(&self, op: impl Fn(&Arc<MemoryDb>) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.conn.run(op)
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> StoreBackend for NullStore<C> {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> BacklogStore for NullStore<C> {
    fn write_transaction(&self, entry: &BacklogEntry) -> Result<bool, StoreError> {
        self.with_db(|db| {
            let mut t = db.write();
            if t.backlog.contains_key(&entry.id()) {
                return Ok(false);
            }
            t.backlog_by_time
                .insert((entry.assignment.assignment_timestamp, entry.id()));
            t.backlog.insert(entry.id(), entry.clone());
            Ok(true)
        })
    }

    fn update_transaction(
        &self,
        id: &TxId,
        update: &BacklogUpdate,
    ) -> Result<Option<BacklogEntry>, StoreError> {
        self.with_db(|db| {
            let mut t = db.write();
            let old = match t.backlog.get(id) {
                Some(entry) if entry.assignment == update.expected => entry.assignment,
                _ => return Ok(None),
            };
            t.backlog_by_time.remove(&(old.assignment_timestamp, *id));
            t.backlog_by_time
                .insert((update.assignment.assignment_timestamp, *id));
            let entry = t.backlog.get_mut(id).map(|e| {
                e.assignment = update.assignment;
                e.clone()
            });
            Ok(entry)
        })
    }

    fn delete_transactions(&self, ids: &[TxId]) -> Result<usize, StoreError> {
        self.with_db(|db| {
            let mut t = db.write();
            let mut deleted = 0;
            for id in ids {
                if let Some(entry) = t.backlog.remove(id) {
                    t.backlog_by_time
                        .remove(&(entry.assignment.assignment_timestamp, *id));
                    deleted += 1;
                }
            }
            Ok(deleted)
        })
    }

    fn get_stale_transactions(
        &self,
        reassign_delay_secs: u64,
        now: Timestamp,
    ) -> Result<QueryIter<BacklogEntry>, StoreError> {
        let cutoff = now.minus_secs(reassign_delay_secs);
        self.with_db(|db| {
            let t = db.read();
            let stale: Vec<BacklogEntry> = t
                .backlog_by_time
                .range(..(cutoff, TxId::ZERO))
                .filter_map(|(_, id)| t.backlog.get(id).cloned())
                .collect();
            Ok(VecIter::boxed(stale))
        })
    }

    fn get_transaction_from_backlog(&self, id: &TxId) -> Result<Option<Transaction>, StoreError> {
        self.with_db(|db| Ok(db.read().backlog.get(id).map(|e| e.transaction.clone())))
    }

    fn count_backlog(&self) -> Result<u64, StoreError> {
        self.with_db(|db| Ok(db.read().backlog.len() as u64))
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> BlockStore for NullStore<C> {
    fn write_block(&self, block: &Block) -> Result<bool, StoreError> {
        self.with_db(|db| {
            let mut t = db.write();
            if t.blocks.contains_key(&block.id) {
                return Ok(false);
            }
            t.index_block(block);
            if block.is_genesis() && t.genesis.is_none() {
                t.genesis = Some(block.id);
            }
            t.blocks.insert(block.id, block.clone());
            Ok(true)
        })
    }

    fn get_block(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        self.with_db(|db| Ok(db.read().blocks.get(id).cloned()))
    }

    fn get_genesis_block(&self) -> Result<Option<Block>, StoreError> {
        self.with_db(|db| {
            let t = db.read();
            Ok(t.genesis.and_then(|id| t.blocks.get(&id).cloned()))
        })
    }

    fn get_transaction_from_block(
        &self,
        tx_id: &TxId,
        block_id: &BlockId,
    ) -> Result<Option<Transaction>, StoreError> {
        self.with_db(|db| Ok(db.read().resolve(&(*block_id, *tx_id))))
    }

    fn get_blocks_status_from_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Vec<BlockVoters>, StoreError> {
        self.with_db(|db| {
            let t = db.read();
            let status = t
                .tx_blocks
                .get(tx_id)
                .into_iter()
                .flatten()
                .filter_map(|id| t.blocks.get(id).map(Block::voters))
                .collect();
            Ok(status)
        })
    }

    fn has_transaction(&self, tx_id: &TxId) -> Result<bool, StoreError> {
        self.with_db(|db| Ok(db.read().tx_blocks.contains_key(tx_id)))
    }

    fn count_blocks(&self) -> Result<u64, StoreError> {
        self.with_db(|db| Ok(db.read().blocks.len() as u64))
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> VoteStore for NullStore<C> {
    fn write_vote(&self, vote: &Vote) -> Result<bool, StoreError> {
        self.with_db(|db| {
            let mut t = db.write();
            let key = (vote.vote.voting_for_block, vote.node_pubkey);
            if let Some(existing) = t.votes.get(&key) {
                return if existing == vote {
                    Ok(false)
                } else {
                    Err(StoreError::Duplicate(format!(
                        "conflicting vote by {} for block {}",
                        vote.node_pubkey, vote.vote.voting_for_block
                    )))
                };
            }
            t.votes.insert(key, vote.clone());
            t.votes_by_voter
                .insert((vote.node_pubkey, vote.vote.voting_for_block));
            Ok(true)
        })
    }

    fn get_votes_by_block_id(&self, block_id: &BlockId) -> Result<Vec<Vote>, StoreError> {
        self.with_db(|db| {
            let t = db.read();
            let votes = t
                .votes
                .range((*block_id, PublicKey([0; 32]))..=(*block_id, PublicKey([0xff; 32])))
                .map(|(_, v)| v.clone())
                .collect();
            Ok(votes)
        })
    }

    fn get_votes_by_block_id_and_voter(
        &self,
        block_id: &BlockId,
        voter: &PublicKey,
    ) -> Result<Vec<Vote>, StoreError> {
        self.with_db(|db| {
            Ok(db
                .read()
                .votes
                .get(&(*block_id, *voter))
                .cloned()
                .into_iter()
                .collect())
        })
    }

    fn get_votes_by_voter(&self, voter: &PublicKey) -> Result<Vec<Vote>, StoreError> {
        self.with_db(|db| {
            let t = db.read();
            let votes = t
                .votes_by_voter
                .range((*voter, BlockId::ZERO)..=(*voter, BlockId::new([0xff; 32])))
                .filter_map(|(v, b)| t.votes.get(&(*b, *v)).cloned())
                .collect();
            Ok(votes)
        })
    }

    fn get_unvoted_blocks(&self, voter: &PublicKey) -> Result<QueryIter<Block>, StoreError> {
        let voter = *voter;
        self.with_db(|db| {
            Ok(Box::new(BlockCursor {
                db: db.clone(),
                last: None,
                select: move |t: &Tables, block: &Block| {
                    let voted = t.votes.contains_key(&(block.id, voter));
                    (!voted && !block.is_genesis()).then(|| block.clone())
                },
            }) as QueryIter<Block>)
        })
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> NullStore<C> {
    fn occurrences(
        &self,
        pick: impl Fn(&Tables) -> Vec<Occurrence>,
    ) -> Result<QueryIter<Transaction>, StoreError> {
        self.with_db(|db| {
            let hits = pick(&db.read());
            Ok(Box::new(OccurrenceIter {
                db: db.clone(),
                hits: hits.into_iter(),
            }) as QueryIter<Transaction>)
        })
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> TransactionIndex for NullStore<C> {
    fn get_txids_by_asset_id(&self, asset_id: &TxId) -> Result<QueryIter<TxId>, StoreError> {
        self.with_db(|db| {
            let ids: Vec<TxId> = db
                .read()
                .by_asset
                .get(asset_id)
                .map(|hits| hits.iter().map(|(_, tx)| *tx).collect())
                .unwrap_or_default();
            Ok(VecIter::boxed(ids))
        })
    }

    fn get_asset_by_id(&self, asset_id: &TxId) -> Result<QueryIter<Asset>, StoreError> {
        self.with_db(|db| {
            let t = db.read();
            let assets: Vec<Asset> = t
                .tx_blocks
                .get(asset_id)
                .into_iter()
                .flatten()
                .filter_map(|block| t.resolve(&(*block, *asset_id)))
                .filter(|tx| tx.operation == Operation::Create)
                .map(|tx| Asset {
                    id: Some(tx.id),
                    data: tx.asset.data,
                })
                .collect();
            Ok(VecIter::boxed(assets))
        })
    }

    fn get_spent(
        &self,
        tx_id: &TxId,
        output_index: u32,
    ) -> Result<QueryIter<Transaction>, StoreError> {
        let link = TransactionLink {
            transaction_id: *tx_id,
            output_index,
        };
        self.occurrences(|t| t.by_spent.get(&link).cloned().unwrap_or_default())
    }

    fn get_owned_ids(&self, owner: &PublicKey) -> Result<QueryIter<Transaction>, StoreError> {
        self.occurrences(|t| t.by_owner.get(owner).cloned().unwrap_or_default())
    }

    fn get_transactions_list(
        &self,
        asset_id: Option<&TxId>,
        operation: Option<Operation>,
    ) -> Result<QueryIter<TxId>, StoreError> {
        if let Some(asset_id) = asset_id {
            let asset_id = *asset_id;
            let matching = self.occurrences(|t| t.by_asset.get(&asset_id).cloned().unwrap_or_default())?;
            return Ok(Box::new(matching.filter_map(move |r| match r {
                Ok(tx) => matches_filters(&tx, Some(&asset_id), operation).then_some(Ok(tx.id)),
                Err(e) => Some(Err(e)),
            })));
        }
        self.with_db(|db| {
            let blocks = BlockCursor {
                db: db.clone(),
                last: None,
                select: move |_: &Tables, block: &Block| {
                    let ids: Vec<TxId> = block
                        .block
                        .transactions
                        .iter()
                        .filter(|tx| matches_filters(tx, None, operation))
                        .map(|tx| tx.id)
                        .collect();
                    (!ids.is_empty()).then_some(ids)
                },
            };
            Ok(Box::new(blocks.flat_map(|batch| match batch {
                Ok(ids) => ids.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })) as QueryIter<TxId>)
        })
    }
}

impl<C: Connector<Handle = Arc<MemoryDb>>> MetaStore for NullStore<C> {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.with_db(|db| {
            db.write().meta.insert(key.to_string(), value.to_vec());
            Ok(())
        })
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_db(|db| Ok(db.read().meta.get(key).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedchain_types::{Assignment, BlockBody, Condition, Input, Output, TX_VERSION};

    fn pk(b: u8) -> PublicKey {
        PublicKey([b; 32])
    }

    fn tx(id: u8, op: Operation, asset: Option<TxId>, spends: Option<(TxId, u32)>, to: u8) -> Transaction {
        Transaction {
            id: TxId::new([id; 32]),
            version: TX_VERSION.into(),
            operation: op,
            inputs: vec![Input {
                owners_before: vec![pk(1)],
                fulfills: spends.map(|(t, i)| TransactionLink {
                    transaction_id: t,
                    output_index: i,
                }),
                fulfillment: None,
            }],
            outputs: vec![Output {
                amount: 1,
                public_keys: vec![pk(to)],
                condition: Condition { threshold: 1 },
            }],
            asset: Asset {
                id: asset,
                data: None,
            },
            metadata: None,
        }
    }

    fn block(id: u8, transactions: Vec<Transaction>) -> Block {
        Block {
            id: BlockId::new([id; 32]),
            block: BlockBody {
                timestamp: Timestamp::new(1),
                transactions,
                node_pubkey: pk(9),
                voters: vec![pk(9)],
            },
            signature: None,
        }
    }

    fn entry(id: u8, at: u64) -> BacklogEntry {
        BacklogEntry {
            transaction: tx(id, Operation::Create, None, None, 1),
            assignment: Assignment {
                assignee: pk(1),
                assignment_timestamp: Timestamp::new(at),
            },
        }
    }

    #[test]
    fn backlog_write_is_idempotent() {
        let store = NullStore::new();
        assert!(store.write_transaction(&entry(1, 10)).unwrap());
        assert!(!store.write_transaction(&entry(1, 20)).unwrap());
        assert_eq!(store.count_backlog().unwrap(), 1);
    }

    #[test]
    fn racing_writers_store_one_record() {
        let store = Arc::new(NullStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let queued = store.write_transaction(&entry(1, 10))?;
                    let written = store.write_block(&block(1, vec![tx(2, Operation::Create, None, None, 1)]))?;
                    Ok::<_, StoreError>((queued, written))
                })
            })
            .collect();
        let results: Vec<(bool, bool)> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        assert_eq!(results.iter().filter(|(queued, _)| *queued).count(), 1);
        assert_eq!(results.iter().filter(|(_, written)| *written).count(), 1);
        assert_eq!(store.count_backlog().unwrap(), 1);
        assert_eq!(store.count_blocks().unwrap(), 1);
        assert_eq!(store.get_blocks_status_from_transaction(&TxId::new([2; 32])).unwrap().len(), 1);
    }

    #[test]
    fn stale_and_cas() {
        let store = NullStore::new();
        let e = entry(1, 10);
        store.write_transaction(&e).unwrap();
        store.write_transaction(&entry(2, 95)).unwrap();

        let stale: Vec<_> = store
            .get_stale_transactions(10, Timestamp::new(100))
            .unwrap()
            .map(|r| r.unwrap().id())
            .collect();
        assert_eq!(stale, vec![e.id()]);

        let update = BacklogUpdate {
            expected: e.assignment,
            assignment: Assignment {
                assignee: pk(2),
                assignment_timestamp: Timestamp::new(100),
            },
        };
        assert!(store.update_transaction(&e.id(), &update).unwrap().is_some());
        assert!(store.update_transaction(&e.id(), &update).unwrap().is_none());
        assert_eq!(
            store
                .get_stale_transactions(10, Timestamp::new(100))
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn spent_owned_and_list() {
        let store = NullStore::new();
        let c = tx(1, Operation::Create, None, None, 1);
        let t = tx(2, Operation::Transfer, Some(c.id), Some((c.id, 0)), 2);
        store.write_block(&block(1, vec![c.clone()])).unwrap();
        store.write_block(&block(2, vec![t.clone()])).unwrap();

        let spent: Vec<_> = store.get_spent(&c.id, 0).unwrap().map(Result::unwrap).collect();
        assert_eq!(spent, vec![t.clone()]);
        assert_eq!(store.get_spent(&t.id, 0).unwrap().count(), 0);

        let owned: Vec<_> = store.get_owned_ids(&pk(2)).unwrap().map(|r| r.unwrap().id).collect();
        assert_eq!(owned, vec![t.id]);

        let all: Vec<_> = store
            .get_transactions_list(Some(&c.id), None)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(all, vec![c.id, t.id]);
        let creates: Vec<_> = store
            .get_transactions_list(Some(&c.id), Some(Operation::Create))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(creates, vec![c.id]);
        let transfers: Vec<_> = store
            .get_transactions_list(None, Some(Operation::Transfer))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(transfers, vec![t.id]);
    }

    #[test]
    fn flaky_store_retries_then_succeeds() {
        let store = NullStore::flaky(2, RetryPolicy::immediate(3));
        assert_eq!(store.count_blocks().unwrap(), 0);
        assert_eq!(store.connection().connector().attempts(), 3);
    }

    #[test]
    fn flaky_store_exhausts_retries() {
        let store = NullStore::flaky(3, RetryPolicy::immediate(3));
        let err = store.count_blocks().unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn schema_version_round_trip() {
        let store = NullStore::new();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(4).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 4);
    }
}
