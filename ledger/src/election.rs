//! Block election status from the federation's votes.

use std::collections::HashSet;

use fedchain_store::VoteStore;
use fedchain_types::{Block, PublicKey, Vote};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{verify_vote, LedgerError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Valid,
    Invalid,
    Undecided,
}

/// Decide a block from `votes` cast by `voters`.
///
/// Only votes for `block` from listed voters with a verifying signature
/// count, each voter once. A strict majority of invalid votes decides
/// first, then a strict majority of valid ones.
pub fn tally_votes(block: &Block, votes: &[Vote]) -> Result<BlockStatus, LedgerError> {
    let voters: HashSet<&PublicKey> = block.block.voters.iter().collect();
    let mut counted = HashSet::new();
    let (mut valid, mut invalid) = (0usize, 0usize);

    for vote in votes {
        if vote.vote.voting_for_block != block.id || !voters.contains(&vote.node_pubkey) {
            continue;
        }
        if !verify_vote(vote)? {
            warn!(block_id = %block.id, voter = %vote.node_pubkey, "ignoring vote with bad signature");
            continue;
        }
        if !counted.insert(vote.node_pubkey) {
            continue;
        }
        if vote.vote.is_block_valid {
            valid += 1;
        } else {
            invalid += 1;
        }
    }

    let n = voters.len();
    Ok(if invalid * 2 > n {
        BlockStatus::Invalid
    } else if valid * 2 > n {
        BlockStatus::Valid
    } else {
        BlockStatus::Undecided
    })
}

/// Election status of `block` from the votes recorded in `store`.
pub fn block_election_status<S>(store: &S, block: &Block) -> Result<BlockStatus, LedgerError>
where
    S: VoteStore + ?Sized,
{
    let votes = store.get_votes_by_block_id(&block.id)?;
    tally_votes(block, &votes)
}
