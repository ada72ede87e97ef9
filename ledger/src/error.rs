use fedchain_store::StoreError;
use fedchain_transactions::TransactionError;
use fedchain_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cyclic vote chain for node {node}: block {block} revisited")]
    CyclicBlockchain { node: String, block: String },

    #[error("node {node} cast more than one vote with previous block {previous}")]
    AmbiguousVoteChain { node: String, previous: String },

    #[error("no genesis block in the ledger")]
    GenesisMissing,

    #[error("federation has no members")]
    EmptyFederation,

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CyclicBlockchain { .. } | Self::AmbiguousVoteChain { .. } => {
                ErrorKind::DataCorruption
            }
            Self::GenesisMissing | Self::BlockNotFound(_) => ErrorKind::NotFound,
            Self::EmptyFederation | Self::Encoding(_) => ErrorKind::Internal,
            Self::Transaction(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

impl From<fedchain_crypto::CryptoError> for LedgerError {
    fn from(e: fedchain_crypto::CryptoError) -> Self {
        LedgerError::Encoding(e.to_string())
    }
}
