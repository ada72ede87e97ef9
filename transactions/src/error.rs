use fedchain_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("{0}")]
    SchemaValidation(String),

    #[error("transaction id {actual} does not match content hash {expected}")]
    InvalidHash { expected: String, actual: String },

    #[error("{0}")]
    InvalidSignature(String),

    #[error("input references unknown transaction {0}")]
    TransactionDoesNotExist(String),

    #[error("output {txid}:{output_index} is already spent")]
    DoubleSpend { txid: String, output_index: u32 },

    #[error("{0}")]
    TransactionOwnerError(String),

    #[error("{0}")]
    AmountError(String),

    #[error("{0}")]
    AssetIdMismatch(String),

    #[error("input transaction {0} is not in a valid block")]
    TransactionNotInValidBlock(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl TransactionError {
    /// Short class name, as reported to clients ("Invalid transaction (DoubleSpend): ...").
    pub fn name(&self) -> &'static str {
        match self {
            Self::SchemaValidation(_) => "SchemaValidationError",
            Self::InvalidHash { .. } => "InvalidHash",
            Self::InvalidSignature(_) => "InvalidSignature",
            Self::TransactionDoesNotExist(_) => "TransactionDoesNotExist",
            Self::DoubleSpend { .. } => "DoubleSpend",
            Self::TransactionOwnerError(_) => "TransactionOwnerError",
            Self::AmountError(_) => "AmountError",
            Self::AssetIdMismatch(_) => "AssetIdMismatch",
            Self::TransactionNotInValidBlock(_) => "TransactionNotInValidBlock",
            Self::Encoding(_) => "EncodingError",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaValidation(_) | Self::InvalidHash { .. } | Self::InvalidSignature(_) => {
                ErrorKind::Validation
            }
            Self::TransactionDoesNotExist(_)
            | Self::DoubleSpend { .. }
            | Self::TransactionOwnerError(_)
            | Self::AmountError(_)
            | Self::AssetIdMismatch(_)
            | Self::TransactionNotInValidBlock(_) => ErrorKind::LedgerConsistency,
            Self::Encoding(_) => ErrorKind::Internal,
        }
    }
}

impl From<fedchain_crypto::CryptoError> for TransactionError {
    fn from(e: fedchain_crypto::CryptoError) -> Self {
        TransactionError::Encoding(e.to_string())
    }
}
