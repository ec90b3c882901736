//! # Trustchain Keys
//!
//! Key custody for Trustchain.
//!
//! ## Overview
//!
//! The custodian owns one or more Ed25519 keypairs, exactly one of which is
//! active. It canonicalizes and signs payloads with the active key, verifies
//! signatures against any PEM public key, and rotates to a fresh key on
//! demand while keeping older keys for historical verification.
//!
//! ## Key Concepts
//!
//! - **KeyRecord**: `{ id, privPem, pubPem }` for one keypair
//! - **KeyState**: `{ activeIndex, keys }`, persisted as a single JSON file
//! - **Rotation**: append a record, advance `activeIndex`, atomically persist
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trustchain_keys::KeyCustodian;
//! use serde_json::json;
//!
//! let custodian = KeyCustodian::open("keys/keystate.json").unwrap();
//! let signed = custodian.sign_json(&json!({ "decision": "approve" }));
//! assert!(custodian.verify(
//!     &signed.canonical,
//!     &signed.signature.to_base64(),
//!     &custodian.active_public_key_pem(),
//! ));
//! ```

pub mod custodian;
pub mod error;
pub mod state;

pub use custodian::{KeyCustodian, KeyInfo, RotatedKey, SignedPayload};
pub use error::{KeyError, Result};
pub use state::{KeyRecord, KeyState};
