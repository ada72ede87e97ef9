//! Record encodings.
//!
//! Blocks and backlog entries embed free-form JSON (asset data, metadata),
//! which bincode cannot decode, so they are stored as JSON. Votes have a
//! fixed shape and use bincode.

use serde::de::DeserializeOwned;
use serde::Serialize;

use fedchain_types::{BlockId, PublicKey, Timestamp, TxId};

use crate::LmdbError;

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub(crate) fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn from_bincode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

pub(crate) fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(a.len() + b.len());
    key.extend_from_slice(a);
    key.extend_from_slice(b);
    key
}

/// `assignment_timestamp_be ++ tx_id`, ordering the backlog by age.
pub(crate) fn backlog_time_key(ts: Timestamp, id: &TxId) -> Vec<u8> {
    concat(&ts.as_secs().to_be_bytes(), id.as_bytes())
}

/// `tx_id ++ block_id`
pub(crate) fn tx_block_key(tx: &TxId, block: &BlockId) -> Vec<u8> {
    concat(tx.as_bytes(), block.as_bytes())
}

/// `block_id ++ voter`
pub(crate) fn vote_key(block: &BlockId, voter: &PublicKey) -> Vec<u8> {
    concat(block.as_bytes(), voter.as_bytes())
}

/// `voter ++ block_id`
pub(crate) fn voter_key(voter: &PublicKey, block: &BlockId) -> Vec<u8> {
    concat(voter.as_bytes(), block.as_bytes())
}

/// Split a 32-byte id off the end of a composite key.
pub(crate) fn trailing_id(key: &[u8]) -> Result<[u8; 32], LmdbError> {
    key.len()
        .checked_sub(32)
        .and_then(|start| key[start..].try_into().ok())
        .ok_or_else(|| LmdbError::Corruption(format!("composite key of {} bytes", key.len())))
}
