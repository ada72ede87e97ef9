//! Ledger logic on top of the storage traits.
//!
//! - [`vote_chain`]: each node's chain tip, derived from its own votes.
//! - [`backlog`]: pending-transaction lifecycle (insert, reassign, complete).
//! - [`admission`]: the full validation pipeline a client transaction must
//!   pass before it reaches the backlog.
//! - [`election`]: block status from the federation's votes.
//! - [`factory`] and [`genesis`]: signed block and vote construction.

pub mod admission;
pub mod backlog;
pub mod election;
pub mod error;
pub mod factory;
pub mod genesis;
pub mod lookup;
pub mod vote_chain;

pub use admission::AdmissionValidator;
pub use backlog::{BacklogManager, ReassignReport};
pub use election::{block_election_status, tally_votes, BlockStatus};
pub use error::LedgerError;
pub use factory::{create_block, create_vote, verify_block, verify_vote};
pub use genesis::{create_genesis_block, init_genesis};
pub use lookup::{get_transaction, LocatedTransaction};
pub use vote_chain::get_last_voted_block;
