//! LedgerEntry: one signed, hash-linked record in the chain.
//!
//! An entry carries 6 fields:
//! - `seq`: dense 0-based position in the chain
//! - `prevHash`: content hash of the previous entry (`null` at position 0)
//! - `contentHash`: SHA-256 of `canonical`
//! - `signature`: Ed25519 signature over `canonical`, as presented at append time
//! - `canonical`: the canonical JSON payload
//! - `ts`: when the entry was appended (UTC, millisecond precision)

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::content_hash;
use crate::crypto::{Sha256Hash, Signature};

/// A single ledger entry as persisted and served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub seq: u64,
    pub prev_hash: Option<Sha256Hash>,
    pub content_hash: Sha256Hash,
    pub signature: Signature,
    pub canonical: String,
    pub ts: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build the entry that follows `head` (or the genesis entry when `head` is `None`).
    pub fn next(
        head: Option<&LedgerEntry>,
        canonical: impl Into<String>,
        signature: Signature,
        ts: DateTime<Utc>,
    ) -> Self {
        let canonical = canonical.into();
        Self {
            seq: head.map_or(0, |h| h.seq + 1),
            prev_hash: head.map(|h| h.content_hash),
            content_hash: content_hash(&canonical),
            signature,
            canonical,
            ts,
        }
    }

    /// Recompute the hash of the stored canonical payload.
    pub fn recompute_hash(&self) -> Sha256Hash {
        content_hash(&self.canonical)
    }

    /// Whether the stored content hash matches the stored payload.
    pub fn is_content_intact(&self) -> bool {
        self.recompute_hash() == self.content_hash
    }

    /// Whether this entry is the genesis entry.
    pub fn is_genesis(&self) -> bool {
        self.seq == 0
    }
}

/// Current time truncated to milliseconds, the precision stored in entries.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
