//! # Trustchain Core
//!
//! Pure primitives for Trustchain: canonical JSON, hashing, signatures,
//! ledger entries and chain verification.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`CanonicalValue`] - Closed JSON value model with ordered object keys
//! - [`LedgerEntry`] - One signed, hash-linked record in the chain
//! - [`Sha256Hash`], [`Signature`], [`PublicKey`], [`Keypair`] - Crypto newtypes
//! - [`ChainReport`] - Result of verifying a whole chain
//!
//! ## Canonicalization
//!
//! Hashing and signing operate on the same canonical bytes. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod value;
pub mod verify;

pub use canonical::{canonicalize, canonicalize_json, content_hash};
pub use crypto::{verify, Keypair, PublicKey, Sha256Hash, Signature, ALGORITHM};
pub use entry::LedgerEntry;
pub use error::{CoreError, Result};
pub use value::{CanonicalValue, Number};
pub use verify::{verify_chain, ChainIssue, ChainReport, IssueKind};
