//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid id {0:?}: expected 64 hex characters")]
    InvalidId(String),

    #[error("invalid public key {0:?}: expected base58-encoded 32 bytes")]
    InvalidPublicKey(String),

    #[error("invalid signature: expected 128 hex characters")]
    InvalidSignature,

    #[error("unknown operation {0:?}")]
    UnknownOperation(String),
}

/// Coarse classification shared by every error type in the workspace.
///
/// Callers decide how to react (retry, reject, alert) from the kind alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Storage unreachable; already retried up to the configured budget.
    Connectivity,
    /// A lookup target does not exist.
    NotFound,
    /// Client-caused: malformed, badly hashed or badly signed input.
    Validation,
    /// Client-caused: input conflicts with ledger state.
    LedgerConsistency,
    /// Stored data contradicts itself (e.g. a cyclic vote chain).
    DataCorruption,
    /// Anything else: misconfiguration, serialization faults, bugs.
    Internal,
}
