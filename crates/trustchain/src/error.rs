//! Error types for the ledger.

use thiserror::Error;
use trustchain_store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The presented signature does not verify over the canonical payload
    /// under the presented public key (or either could not be decoded).
    #[error("signature invalid")]
    SignatureInvalid,

    /// A durability step failed; the append was not applied.
    #[error("persist failed: {0}")]
    Persist(#[source] StoreError),

    /// Durable state could not be read back.
    #[error("recovery failed: {0}")]
    Recovery(#[source] StoreError),

    /// The worker task has stopped.
    #[error("ledger unavailable")]
    Unavailable,
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
