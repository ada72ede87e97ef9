//! Blocks: ordered batches of transactions voted on by the federation.

use serde::{Deserialize, Serialize};

use crate::{BlockId, Operation, PublicKey, Signature, Timestamp, Transaction, TxId};

/// The signed part of a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockBody {
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    /// The node that assembled the block.
    pub node_pubkey: PublicKey,
    /// Federation members expected to vote on this block.
    pub voters: Vec<PublicKey>,
}

/// A written block. Owns copies of the transactions it embeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub id: BlockId,
    pub block: BlockBody,
    pub signature: Option<Signature>,
}

/// Projection returned by `get_blocks_status_from_transaction`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockVoters {
    pub id: BlockId,
    pub voters: Vec<PublicKey>,
}

impl Block {
    /// The genesis block is the one whose first transaction is GENESIS.
    pub fn is_genesis(&self) -> bool {
        self.block
            .transactions
            .first()
            .is_some_and(|tx| tx.operation == Operation::Genesis)
    }

    pub fn transaction(&self, id: &TxId) -> Option<&Transaction> {
        self.block.transactions.iter().find(|tx| tx.id == *id)
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.transaction(id).is_some()
    }

    pub fn tx_ids(&self) -> impl Iterator<Item = TxId> + '_ {
        self.block.transactions.iter().map(|tx| tx.id)
    }

    pub fn voters(&self) -> BlockVoters {
        BlockVoters {
            id: self.id,
            voters: self.block.voters.clone(),
        }
    }
}
