//! # Trustchain Store
//!
//! Durable storage for the ledger. Provides a trait-based interface for
//! ledger persistence with file-backed and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts ledger durability behind the [`LedgerStore`]
//! trait, keeping the ledger itself storage-agnostic. The primary
//! implementation is [`FileStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - The blocking trait for durability operations
//! - [`FileStore`] - Write-ahead log + snapshot + head pointer on disk
//! - [`MemoryStore`] - In-memory storage with failure injection for tests
//! - [`Recovery`] - Result of rebuilding a ledger on startup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trustchain_store::{FileStore, LedgerStore};
//!
//! let store = FileStore::open("data").unwrap();
//! let recovery = store.load().unwrap();
//! println!("recovered {} entries from {:?}", recovery.entries.len(), recovery.source);
//! ```
//!
//! ## Design Notes
//!
//! - **Snapshot first**: a readable snapshot is authoritative on recovery
//! - **Log fallback**: an unreadable snapshot falls back to WAL replay
//! - **Torn records**: unparseable WAL lines are skipped with a warning
//! - **Atomic replace**: snapshot and head are written via temp file + rename

pub mod error;
pub mod file;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use fs::atomic_write;
pub use memory::{FailPoint, MemoryStore};
pub use traits::{LedgerStore, LedgerStoreExt, Recovery, RecoverySource};
