//! Fundamental types for fedchain.
//!
//! This crate defines the data model shared across every other crate in the
//! workspace: content-addressed ids, Ed25519 key material, timestamps, and the
//! ledger records themselves (transactions, blocks, votes, backlog entries).

pub mod backlog;
pub mod block;
pub mod error;
pub mod hash;
pub mod keys;
pub mod time;
pub mod transaction;
pub mod vote;

pub use backlog::{Assignment, BacklogEntry};
pub use block::{Block, BlockBody, BlockVoters};
pub use error::{ErrorKind, TypesError};
pub use hash::{BlockId, TxId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::{Clock, SystemClock, Timestamp};
pub use transaction::{
    Asset, Condition, FulfillmentSig, Input, Metadata, Operation, Output, Transaction,
    TransactionLink, TX_VERSION,
};
pub use vote::{Vote, VoteBody};
