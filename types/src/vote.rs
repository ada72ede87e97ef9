//! Votes: a federation member's signed verdict on a block.

use serde::{Deserialize, Serialize};

use crate::{BlockId, PublicKey, Signature, Timestamp};

/// The signed part of a vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteBody {
    pub voting_for_block: BlockId,
    /// The block the voter believes precedes `voting_for_block`.
    pub previous_block: BlockId,
    pub is_block_valid: bool,
    pub invalid_reason: Option<String>,
    pub timestamp: Timestamp,
}

/// A vote record. Append-only; never mutated after it is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Vote {
    pub node_pubkey: PublicKey,
    pub vote: VoteBody,
    pub signature: Signature,
}
