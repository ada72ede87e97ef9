//! Genesis block creation: the first block of every ledger.

use fedchain_store::LedgerStore;
use fedchain_types::{Block, KeyPair, PublicKey, Timestamp};
use tracing::info;

use crate::{create_block, LedgerError};

/// A block holding the single GENESIS transaction created by `node`.
pub fn create_genesis_block(
    node: &KeyPair,
    voters: Vec<PublicKey>,
    timestamp: Timestamp,
) -> Result<Block, LedgerError> {
    let tx = fedchain_transactions::genesis(node.public)?;
    create_block(vec![tx], node, voters, timestamp)
}

/// Write a genesis block unless the ledger already has one.
///
/// Returns the ledger's genesis block either way.
pub fn init_genesis<S: LedgerStore + ?Sized>(
    store: &S,
    node: &KeyPair,
    voters: Vec<PublicKey>,
    timestamp: Timestamp,
) -> Result<Block, LedgerError> {
    if let Some(existing) = store.get_genesis_block()? {
        return Ok(existing);
    }
    let block = create_genesis_block(node, voters, timestamp)?;
    store.write_block(&block)?;
    info!(block_id = %block.id, "genesis block created");
    Ok(block)
}
