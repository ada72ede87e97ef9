//! Vote storage trait.

use crate::{unsupported, QueryIter, StoreBackend, StoreError};
use fedchain_types::{Block, BlockId, PublicKey, Vote};

/// Append-only vote records.
///
/// At most one vote is kept per `(voter, voting_for_block)`. Re-writing an
/// identical vote is a no-op; a conflicting one is `StoreError::Duplicate`.
pub trait VoteStore: StoreBackend {
    fn write_vote(&self, vote: &Vote) -> Result<bool, StoreError> {
        let _ = vote;
        Err(unsupported(self, "write_vote"))
    }

    fn get_votes_by_block_id(&self, block_id: &BlockId) -> Result<Vec<Vote>, StoreError> {
        let _ = block_id;
        Err(unsupported(self, "get_votes_by_block_id"))
    }

    fn get_votes_by_block_id_and_voter(
        &self,
        block_id: &BlockId,
        voter: &PublicKey,
    ) -> Result<Vec<Vote>, StoreError> {
        let _ = (block_id, voter);
        Err(unsupported(self, "get_votes_by_block_id_and_voter"))
    }

    /// Every vote cast by `voter`, in storage order.
    fn get_votes_by_voter(&self, voter: &PublicKey) -> Result<Vec<Vote>, StoreError> {
        let _ = voter;
        Err(unsupported(self, "get_votes_by_voter"))
    }

    /// Blocks `voter` has not voted on yet, genesis excluded.
    fn get_unvoted_blocks(&self, voter: &PublicKey) -> Result<QueryIter<Block>, StoreError> {
        let _ = voter;
        Err(unsupported(self, "get_unvoted_blocks"))
    }
}
