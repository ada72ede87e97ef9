use fedchain_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] fedchain_store::StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] fedchain_ledger::LedgerError),

    #[error("transaction error: {0}")]
    Transaction(#[from] fedchain_transactions::TransactionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Transaction(e) => e.kind(),
            Self::Config(_) | Self::Io(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }
}

impl From<fedchain_crypto::CryptoError> for NodeError {
    fn from(e: fedchain_crypto::CryptoError) -> Self {
        NodeError::Config(format!("keypair: {e}"))
    }
}
