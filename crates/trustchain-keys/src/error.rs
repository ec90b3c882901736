//! Error types for the key custodian.

use thiserror::Error;

/// Errors that can occur during key custody operations.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key-state file could not be read or written.
    #[error("key storage error: {0}")]
    Storage(#[from] trustchain_store::StoreError),

    /// The key-state file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key-state file is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key-state file parsed but violates an invariant.
    #[error("invalid key state: {0}")]
    InvalidState(String),

    /// Key material could not be decoded or encoded.
    #[error("core error: {0}")]
    Core(#[from] trustchain_core::CoreError),
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, KeyError>;
