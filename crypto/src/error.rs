use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("canonical encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("key file error: {0}")]
    KeyFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
