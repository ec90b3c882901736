//! # Trustchain Testkit
//!
//! Testing utilities for Trustchain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: canonical strings, hashes and signatures that every
//!   client of the ledger must reproduce byte for byte
//! - **Generators**: Proptest strategies for JSON payloads and keys
//! - **Fixtures**: a temporary custodian + ledger for integration tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use trustchain_testkit::vectors::{all_vectors, compute};
//!
//! for vector in all_vectors() {
//!     let result = compute(&vector);
//!     assert!(result.matches(&vector), "{}", vector.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use trustchain_core::canonicalize_json;
//! use trustchain_testkit::generators::json_value;
//!
//! proptest! {
//!     #[test]
//!     fn canonical_is_deterministic(value in json_value()) {
//!         prop_assert_eq!(canonicalize_json(&value), canonicalize_json(&value));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::TestFixture;
