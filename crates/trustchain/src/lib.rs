//! # Trustchain
//!
//! A signed, hash-linked, append-only event ledger with a key custodian.
//!
//! ## Overview
//!
//! Any JSON payload can be canonicalized, signed by the custodian's active
//! key, and durably chained so that later auditors can detect a retroactive
//! edit to history:
//!
//! - **Signer**: key custody, canonicalization, sign/verify, rotation
//! - **Ledger**: single-writer append log with WAL + snapshot durability
//! - **Verify**: recompute every content hash and check every link
//!
//! ## Key Concepts
//!
//! - **Entry**: `{ seq, prevHash, contentHash, signature, canonical, ts }`
//! - **Head**: the most recently appended entry
//! - **Idempotent append**: re-submitting the head's payload returns the head
//! - **Rollback**: an append whose durability fails is never published
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trustchain::{KeyCustodian, Ledger, LedgerConfig};
//! use serde_json::json;
//!
//! async fn example() {
//!     let custodian = KeyCustodian::open("keys/keystate.json").unwrap();
//!     let ledger = Ledger::open(&LedgerConfig::default()).await.unwrap();
//!
//!     let signed = custodian.sign_json(&json!({ "a": 1 }));
//!     let appended = ledger
//!         .append(
//!             signed.canonical,
//!             &signed.signature.to_base64(),
//!             &custodian.active_public_key_pem(),
//!         )
//!         .await
//!         .unwrap();
//!     assert_eq!(appended.entry.seq, 0);
//!     assert!(ledger.verify().ok);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `trustchain::core` - Canonicalization, crypto, entries, verification
//! - `trustchain::store` - Ledger durability
//! - `trustchain::keys` - Key custody

pub mod config;
pub mod error;
pub mod ledger;

pub use trustchain_core as core;
pub use trustchain_keys as keys;
pub use trustchain_store as store;

pub use config::{LedgerConfig, SignerConfig};
pub use error::{LedgerError, Result};
pub use ledger::{Appended, Health, HealthStatus, Ledger, Reloaded};

pub use trustchain_core::{
    canonicalize, canonicalize_json, ChainIssue, ChainReport, IssueKind, LedgerEntry, Sha256Hash,
    Signature,
};
pub use trustchain_keys::{KeyCustodian, KeyInfo, RotatedKey, SignedPayload};
