use fedchain_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("backend {0} is already registered")]
    DuplicateRegistration(String),

    #[error("operation {operation} is not supported by the {backend} backend")]
    UnsupportedOperation {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("no backend registered for {0}")]
    UnsupportedBackend(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connectivity,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Corruption(_) => ErrorKind::DataCorruption,
            _ => ErrorKind::Internal,
        }
    }

    /// Whether a fresh connection might make the operation succeed.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
