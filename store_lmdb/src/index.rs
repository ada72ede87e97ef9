//! LMDB implementation of TransactionIndex.
//!
//! Asset, spend and ownership queries unwind the transactions of every
//! written block, one block per read transaction. Lookups by a known
//! transaction id go through the `tx_blocks` index instead.

use fedchain_store::{matches_filters, QueryIter, StoreError, TransactionIndex, VecIter};
use fedchain_types::{Asset, Block, Operation, PublicKey, Transaction, TxId};

use crate::block::{blocks_containing, read_block};
use crate::codec::from_json;
use crate::cursor::Cursor;
use crate::{LmdbEnvironment, LmdbError, LmdbStore};

/// Lazily map every embedded transaction through `select`, skipping `None`.
fn scan_transactions<T, F>(env: &LmdbEnvironment, mut select: F) -> QueryIter<T>
where
    T: Send + 'static,
    F: FnMut(Transaction) -> Option<T> + Send + 'static,
{
    let blocks = Cursor::new(
        env.clone(),
        env.bigchain_db,
        Vec::new(),
        None,
        move |_, _, _, value| {
            let block: Block = from_json(value)?;
            let selected: Vec<T> = block
                .block
                .transactions
                .into_iter()
                .filter_map(&mut select)
                .collect();
            Ok((!selected.is_empty()).then_some(selected))
        },
    );
    Box::new(blocks.flat_map(|batch| match batch {
        Ok(items) => items.into_iter().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(e)],
    }))
}

impl TransactionIndex for LmdbStore {
    fn get_txids_by_asset_id(&self, asset_id: &TxId) -> Result<QueryIter<TxId>, StoreError> {
        let asset_id = *asset_id;
        self.with_env(|env| {
            Ok(scan_transactions(env, move |tx| {
                (tx.asset_id() == Some(asset_id)).then_some(tx.id)
            }))
        })
    }

    fn get_asset_by_id(&self, asset_id: &TxId) -> Result<QueryIter<Asset>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let mut assets = Vec::new();
            for block_id in blocks_containing(env, &rtxn, asset_id)? {
                let Some(block) = read_block(env, &rtxn, block_id.as_bytes())? else {
                    continue;
                };
                if let Some(tx) = block.transaction(asset_id) {
                    if tx.operation == Operation::Create {
                        assets.push(Asset {
                            id: Some(tx.id),
                            data: tx.asset.data.clone(),
                        });
                    }
                }
            }
            Ok(VecIter::boxed(assets))
        })
    }

    fn get_spent(
        &self,
        tx_id: &TxId,
        output_index: u32,
    ) -> Result<QueryIter<Transaction>, StoreError> {
        let tx_id = *tx_id;
        self.with_env(|env| {
            Ok(scan_transactions(env, move |tx| {
                tx.fulfills(&tx_id, output_index).then_some(tx)
            }))
        })
    }

    fn get_owned_ids(&self, owner: &PublicKey) -> Result<QueryIter<Transaction>, StoreError> {
        let owner = *owner;
        self.with_env(|env| Ok(scan_transactions(env, move |tx| tx.pays_to(&owner).then_some(tx))))
    }

    fn get_transactions_list(
        &self,
        asset_id: Option<&TxId>,
        operation: Option<Operation>,
    ) -> Result<QueryIter<TxId>, StoreError> {
        let asset_id = asset_id.copied();
        self.with_env(|env| {
            Ok(scan_transactions(env, move |tx| {
                matches_filters(&tx, asset_id.as_ref(), operation).then_some(tx.id)
            }))
        })
    }
}
