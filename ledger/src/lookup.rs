//! Locating committed transactions together with their block's status.

use fedchain_store::{BlockStore, VoteStore};
use fedchain_types::{BlockId, Transaction, TxId};

use crate::{block_election_status, BlockStatus, LedgerError};

#[derive(Clone, Debug, PartialEq)]
pub struct LocatedTransaction {
    pub transaction: Transaction,
    pub block_id: BlockId,
    pub status: BlockStatus,
}

/// Find `tx_id` in the written blocks.
///
/// A transaction may sit in several blocks if an earlier block was voted
/// invalid; a copy in a VALID block wins, then an UNDECIDED one. Copies in
/// INVALID blocks are returned only when nothing better exists.
pub fn get_transaction<S>(store: &S, tx_id: &TxId) -> Result<Option<LocatedTransaction>, LedgerError>
where
    S: BlockStore + VoteStore + ?Sized,
{
    let mut best: Option<LocatedTransaction> = None;
    for candidate in store.get_blocks_status_from_transaction(tx_id)? {
        let Some(block) = store.get_block(&candidate.id)? else {
            continue;
        };
        let Some(transaction) = block.transaction(tx_id).cloned() else {
            continue;
        };
        let status = block_election_status(store, &block)?;
        let rank = |s: BlockStatus| match s {
            BlockStatus::Valid => 2,
            BlockStatus::Undecided => 1,
            BlockStatus::Invalid => 0,
        };
        if best.as_ref().map_or(true, |b| rank(status) > rank(b.status)) {
            best = Some(LocatedTransaction {
                transaction,
                block_id: block.id,
                status,
            });
        }
        if status == BlockStatus::Valid {
            break;
        }
    }
    Ok(best)
}
