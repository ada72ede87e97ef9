//! Signed block and vote construction.
//!
//! A block id is the content hash of its body and the creator signs the id.
//! A vote is signed over the content hash of its body.

use fedchain_crypto::{content_hash, sign_message, verify_signature};
use fedchain_types::{
    Block, BlockBody, BlockId, KeyPair, PublicKey, Timestamp, Transaction, Vote, VoteBody,
};

use crate::LedgerError;

pub fn create_block(
    transactions: Vec<Transaction>,
    creator: &KeyPair,
    voters: Vec<PublicKey>,
    timestamp: Timestamp,
) -> Result<Block, LedgerError> {
    let body = BlockBody {
        timestamp,
        transactions,
        node_pubkey: creator.public,
        voters,
    };
    let id = BlockId::new(content_hash(&body)?);
    let signature = sign_message(id.as_bytes(), &creator.private);
    Ok(Block {
        id,
        block: body,
        signature: Some(signature),
    })
}

/// The id matches the body and the creator's signature verifies.
pub fn verify_block(block: &Block) -> Result<bool, LedgerError> {
    if BlockId::new(content_hash(&block.block)?) != block.id {
        return Ok(false);
    }
    Ok(block.signature.as_ref().is_some_and(|sig| {
        verify_signature(block.id.as_bytes(), sig, &block.block.node_pubkey)
    }))
}

pub fn create_vote(
    voter: &KeyPair,
    voting_for_block: BlockId,
    previous_block: BlockId,
    invalid_reason: Option<String>,
    timestamp: Timestamp,
) -> Result<Vote, LedgerError> {
    let body = VoteBody {
        voting_for_block,
        previous_block,
        is_block_valid: invalid_reason.is_none(),
        invalid_reason,
        timestamp,
    };
    let signature = sign_message(&content_hash(&body)?, &voter.private);
    Ok(Vote {
        node_pubkey: voter.public,
        vote: body,
        signature,
    })
}

pub fn verify_vote(vote: &Vote) -> Result<bool, LedgerError> {
    let digest = content_hash(&vote.vote)?;
    Ok(verify_signature(&digest, &vote.signature, &vote.node_pubkey))
}
