//! Vote-chain resolution.
//!
//! Each node follows its own votes rather than a shared "latest block"
//! pointer: the votes induce a map `previous_block -> voting_for_block`, and
//! the node's tip is where a walk over that map runs out.

use std::collections::{HashMap, HashSet};

use fedchain_store::{BlockStore, VoteStore};
use fedchain_types::{Block, BlockId, PublicKey, Vote};
use tracing::{debug, error};

use crate::LedgerError;

/// The block `node` currently treats as its chain tip.
///
/// A node without votes sits on the genesis block. Recomputed on every call.
pub fn get_last_voted_block<S>(store: &S, node: &PublicKey) -> Result<Block, LedgerError>
where
    S: BlockStore + VoteStore + ?Sized,
{
    let votes = store.get_votes_by_voter(node)?;
    if votes.is_empty() {
        debug!(node = %node, "no votes recorded, tip is genesis");
        return store.get_genesis_block()?.ok_or(LedgerError::GenesisMissing);
    }

    let tip = resolve_tip(node, &votes)?;
    store
        .get_block(&tip)?
        .ok_or_else(|| LedgerError::BlockNotFound(tip.to_string()))
}

/// Walk `votes` (all cast by `node`) to the block at the end of the chain.
///
/// Two votes sharing a `previous_block` make the chain ambiguous and a
/// revisited block means the vote history is cyclic; both are errors.
pub fn resolve_tip(node: &PublicKey, votes: &[Vote]) -> Result<BlockId, LedgerError> {
    let first = match votes.first() {
        Some(vote) => vote.vote.voting_for_block,
        None => {
            return Err(LedgerError::BlockNotFound(format!(
                "no votes by {node} to resolve"
            )))
        }
    };

    let mut next: HashMap<BlockId, BlockId> = HashMap::with_capacity(votes.len());
    for vote in votes {
        let body = &vote.vote;
        if next.insert(body.previous_block, body.voting_for_block).is_some() {
            error!(node = %node, previous = %body.previous_block, "ambiguous vote chain");
            return Err(LedgerError::AmbiguousVoteChain {
                node: node.to_string(),
                previous: body.previous_block.to_string(),
            });
        }
    }

    let mut explored = HashSet::with_capacity(next.len());
    let mut current = first;
    loop {
        if !explored.insert(current) {
            error!(node = %node, block = %current, "cyclic vote chain");
            return Err(LedgerError::CyclicBlockchain {
                node: node.to_string(),
                block: current.to_string(),
            });
        }
        match next.get(&current) {
            Some(following) => current = *following,
            None => return Ok(current),
        }
    }
}
