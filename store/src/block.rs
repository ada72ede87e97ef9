//! Block storage trait.

use crate::{unsupported, StoreBackend, StoreError};
use fedchain_types::{Block, BlockId, BlockVoters, Transaction, TxId};

/// Written blocks (the `bigchain` collection).
pub trait BlockStore: StoreBackend {
    /// Insert `block` unless a block with the same id exists. Returns `true`
    /// if this call wrote it.
    fn write_block(&self, block: &Block) -> Result<bool, StoreError> {
        let _ = block;
        Err(unsupported(self, "write_block"))
    }

    fn get_block(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        let _ = id;
        Err(unsupported(self, "get_block"))
    }

    /// The block whose first transaction is GENESIS.
    fn get_genesis_block(&self) -> Result<Option<Block>, StoreError> {
        Err(unsupported(self, "get_genesis_block"))
    }

    /// `None` when the block is missing or does not contain the transaction.
    fn get_transaction_from_block(
        &self,
        tx_id: &TxId,
        block_id: &BlockId,
    ) -> Result<Option<Transaction>, StoreError> {
        let _ = (tx_id, block_id);
        Err(unsupported(self, "get_transaction_from_block"))
    }

    /// Every block that embeds `tx_id`, with its voter list.
    fn get_blocks_status_from_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Vec<BlockVoters>, StoreError> {
        let _ = tx_id;
        Err(unsupported(self, "get_blocks_status_from_transaction"))
    }

    /// Whether any written block embeds `tx_id`.
    fn has_transaction(&self, tx_id: &TxId) -> Result<bool, StoreError> {
        let _ = tx_id;
        Err(unsupported(self, "has_transaction"))
    }

    fn count_blocks(&self) -> Result<u64, StoreError> {
        Err(unsupported(self, "count_blocks"))
    }
}
