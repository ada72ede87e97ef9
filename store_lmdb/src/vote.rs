//! LMDB implementation of VoteStore.
//!
//! Votes are keyed `block_id ++ voter`; `votes_by_voter` holds the
//! transposed key so a node's own votes are a prefix scan.

use fedchain_store::{QueryIter, StoreError, VoteStore};
use fedchain_types::{Block, BlockId, PublicKey, Vote};

use crate::codec::{from_bincode, from_json, to_bincode, trailing_id, vote_key, voter_key};
use crate::cursor::Cursor;
use crate::{LmdbError, LmdbStore};

impl VoteStore for LmdbStore {
    fn write_vote(&self, vote: &Vote) -> Result<bool, StoreError> {
        let bytes = to_bincode(vote)?;
        let block = vote.vote.voting_for_block;
        self.with_env(|env| {
            let key = vote_key(&block, &vote.node_pubkey);
            let mut wtxn = env.env.write_txn().map_err(LmdbError::from)?;
            if let Some(existing) = env.votes_db.get(&wtxn, &key).map_err(LmdbError::from)? {
                return if existing == bytes.as_slice() {
                    Ok(false)
                } else {
                    Err(StoreError::Duplicate(format!(
                        "conflicting vote by {} for block {}",
                        vote.node_pubkey, block
                    )))
                };
            }
            env.votes_db
                .put(&mut wtxn, &key, &bytes)
                .map_err(LmdbError::from)?;
            env.votes_by_voter_db
                .put(&mut wtxn, &voter_key(&vote.node_pubkey, &block), &[])
                .map_err(LmdbError::from)?;
            wtxn.commit().map_err(LmdbError::from)?;
            Ok(true)
        })
    }

    fn get_votes_by_block_id(&self, block_id: &BlockId) -> Result<Vec<Vote>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let mut votes = Vec::new();
            for item in env
                .votes_db
                .prefix_iter(&rtxn, block_id.as_bytes())
                .map_err(LmdbError::from)?
            {
                let (_, bytes) = item.map_err(LmdbError::from)?;
                votes.push(from_bincode(bytes)?);
            }
            Ok(votes)
        })
    }

    fn get_votes_by_block_id_and_voter(
        &self,
        block_id: &BlockId,
        voter: &PublicKey,
    ) -> Result<Vec<Vote>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let vote = match env
                .votes_db
                .get(&rtxn, &vote_key(block_id, voter))
                .map_err(LmdbError::from)?
            {
                Some(bytes) => vec![from_bincode(bytes)?],
                None => Vec::new(),
            };
            Ok(vote)
        })
    }

    fn get_votes_by_voter(&self, voter: &PublicKey) -> Result<Vec<Vote>, StoreError> {
        self.with_env(|env| {
            let rtxn = env.env.read_txn().map_err(LmdbError::from)?;
            let mut votes = Vec::new();
            for item in env
                .votes_by_voter_db
                .prefix_iter(&rtxn, voter.as_bytes())
                .map_err(LmdbError::from)?
            {
                let (key, _) = item.map_err(LmdbError::from)?;
                let block = BlockId::new(trailing_id(key)?);
                let bytes = env
                    .votes_db
                    .get(&rtxn, &vote_key(&block, voter))
                    .map_err(LmdbError::from)?
                    .ok_or_else(|| {
                        LmdbError::Corruption(format!("voter index points at missing vote for {block}"))
                    })?;
                votes.push(from_bincode(bytes)?);
            }
            Ok(votes)
        })
    }

    fn get_unvoted_blocks(&self, voter: &PublicKey) -> Result<QueryIter<Block>, StoreError> {
        let voter = *voter;
        self.with_env(|env| {
            let cursor = Cursor::new(
                env.clone(),
                env.bigchain_db,
                Vec::new(),
                None,
                move |env, rtxn, key, value| {
                    let block_id = BlockId::new(trailing_id(key)?);
                    if env.votes_db.get(rtxn, &vote_key(&block_id, &voter))?.is_some() {
                        return Ok(None);
                    }
                    let block: Block = from_json(value)?;
                    Ok((!block.is_genesis()).then_some(block))
                },
            );
            Ok(Box::new(cursor) as QueryIter<Block>)
        })
    }
}
