//! Abstract storage layer for fedchain.
//!
//! Every backend (LMDB, in-memory for testing) implements the query traits
//! in this crate. The rest of the codebase depends only on the traits and
//! obtains a concrete store through [`QueryRegistry`].
//!
//! Query methods have default bodies that fail with
//! [`StoreError::UnsupportedOperation`], so a backend may implement a subset
//! and callers get a typed error for the rest.

pub mod backlog;
pub mod block;
pub mod error;
pub mod index;
pub mod iter;
pub mod meta;
pub mod port;
pub mod registry;
pub mod vote;

pub use backlog::{BacklogStore, BacklogUpdate};
pub use block::BlockStore;
pub use error::StoreError;
pub use index::{matches_filters, TransactionIndex};
pub use iter::{QueryIter, VecIter};
pub use meta::{MetaStore, SCHEMA_VERSION_KEY};
pub use port::{Connection, Connector, RetryPolicy};
pub use registry::{BackendConfig, BackendKind, QueryRegistry, StoreFactory};
pub use vote::VoteStore;

/// Identifies a backend in errors and logs.
pub trait StoreBackend {
    fn backend_name(&self) -> &'static str;
}

/// The full set of ledger operations. Implemented automatically for any
/// backend that implements every query trait.
pub trait LedgerStore:
    BacklogStore + BlockStore + VoteStore + TransactionIndex + MetaStore + Send + Sync
{
}

impl<T> LedgerStore for T where
    T: BacklogStore + BlockStore + VoteStore + TransactionIndex + MetaStore + Send + Sync
{
}

pub(crate) fn unsupported<B: StoreBackend + ?Sized>(backend: &B, operation: &'static str) -> StoreError {
    StoreError::UnsupportedOperation {
        backend: backend.backend_name(),
        operation,
    }
}
