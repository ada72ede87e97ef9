//! LMDB implementation of BlockStore.
//!
//! Blocks are stored whole in `bigchain`. Writing a block also records
//! `tx_id ++ block_id` in `tx_blocks` for every embedded transaction, and
//! remembers the genesis block id in `meta`.

use fedchain_store::{BlockStore, StoreError};
use fedchain_types::{Block, BlockId, BlockVoters, Transaction, TxId};

use crate::codec::{from_json, to_json, trailing_id, tx_block_key};
use crate::{LmdbEnvironment, LmdbError, LmdbStore};

pub(crate) const GENESIS_KEY: &[u8] = b"genesis_block";

pub(crate) fn read_block(
    env: &LmdbEnvironment,
    rtxn: &heed::RoTxn<'_>,
    id: &[u8],
) -> Result<Option<Block>, LmdbError> {
    match env.bigchain_db.get(rtxn, id)? {
        Some(bytes) => Ok(Some(from_json(bytes)?)),
        None => Ok(None),
    }
}

/// Block ids embedding `tx_id`, via the `tx_blocks` index.
pub(crate) fn blocks_containing(
    env: &LmdbEnvironment,
    rtxn: &heed::RoTxn<'_>,
    tx_id: &TxId,
) -> Result<Vec<BlockId>, LmdbError> {
    let mut ids = Vec::new();
    for item in env.tx_blocks_db.prefix_iter(rtxn, tx_id.as_bytes())? {
        let (key, _) = item?;
        ids.push(BlockId::new(trailing_id(key)?));
    }
    Ok(ids)
}

impl BlockStore for LmdbStore {
    fn write_block(&self, block: &Block) -> Result<bool, StoreError> {
        let bytes = to_json(block)?;
        self.with_env(|env| {
            let mut wtxn = env.env.write_txn().map_err(LmdbError::from)?;
            if env
                .bigchain_db
                .get(&wtxn, block.id.as_bytes())
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Ok(false);
            }
            env.bigchain_db
                .put(&mut wtxn, block.id.as_bytes(), &bytes)
                .map_err(LmdbError::from)?;
            for tx_id in block.tx_ids() {
                env.tx_blocks_db
                    .put(&mut wtxn, &tx_block_key(&tx_id, &block.id), &[])
                    .map_err(LmdbError::from)?;
            }
            if block.is_genesis()
                && env
                    .meta_db
                    .get(&wtxn, GENESIS_KEY)
                    .map_err(LmdbError::from)?
                    .is_none()
            {
                env.meta_db
                    .put(&mut wtxn, GENESIS_KEY, block.id.as_bytes())
                    .map_err(LmdbError::from)?;
            }
            wtxn.commit().map_err(LmdbError::from)?;
            Ok(true)
        })
    }

    fn get_block(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            Ok(read_block(env, &rtxn, id.as_bytes())?)
        })
    }

    fn get_genesis_block(&self) -> Result<Option<Block>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let id = match env.meta_db.get(&rtxn, GENESIS_KEY).map_err(LmdbError::from)? {
                Some(id) => id.to_vec(),
                None => return Ok(None),
            };
            match read_block(env, &rtxn, &id)? {
                Some(block) => Ok(Some(block)),
                None => Err(StoreError::Corruption(
                    "genesis block id recorded but block missing".into(),
                )),
            }
        })
    }

    fn get_transaction_from_block(
        &self,
        tx_id: &TxId,
        block_id: &BlockId,
    ) -> Result<Option<Transaction>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let block = read_block(env, &rtxn, block_id.as_bytes())?;
            Ok(block.and_then(|b| b.transaction(tx_id).cloned()))
        })
    }

    fn get_blocks_status_from_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Vec<BlockVoters>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let mut result = Vec::new();
            for block_id in blocks_containing(env, &rtxn, tx_id)? {
                let block = read_block(env, &rtxn, block_id.as_bytes())?.ok_or_else(|| {
                    LmdbError::Corruption(format!("tx index points at missing block {block_id}"))
                })?;
                result.push(block.voters());
            }
            Ok(result)
        })
    }

    fn has_transaction(&self, tx_id: &TxId) -> Result<bool, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let mut iter = env
                .tx_blocks_db
                .prefix_iter(&rtxn, tx_id.as_bytes())
                .map_err(LmdbError::from)?;
            Ok(iter.next().transpose().map_err(LmdbError::from)?.is_some())
        })
    }

    fn count_blocks(&self) -> Result<u64, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let count = env.bigchain_db.len(&rtxn).map_err(LmdbError::from)?;
            Ok(count)
        })
    }
}
