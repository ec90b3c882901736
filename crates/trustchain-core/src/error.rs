//! Error types for Trustchain Core.

use thiserror::Error;

/// Core errors that can occur while decoding keys, signatures and values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed hash: {0}")]
    MalformedHash(String),

    #[error("key encoding error: {0}")]
    EncodingError(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
