//! Key state: the persisted set of keypairs and which one is active.
//!
//! On disk this is a single JSON object:
//!
//! ```json
//! { "activeIndex": 1, "keys": [ { "id": "...", "privPem": "...", "pubPem": "..." } ] }
//! ```
//!
//! Keys are only ever appended. `activeIndex` moves forward on rotation; older
//! keys stay in the file so historical signatures remain checkable.

use serde::{Deserialize, Serialize};

use trustchain_core::{Keypair, PublicKey};

use crate::error::{KeyError, Result};

/// One persisted keypair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub id: String,
    pub priv_pem: String,
    pub pub_pem: String,
}

impl KeyRecord {
    /// Wrap a keypair as a record.
    pub fn from_keypair(keypair: &Keypair) -> Result<Self> {
        let public_key = keypair.public_key();
        Ok(Self {
            id: public_key.fingerprint(),
            priv_pem: keypair.to_pkcs8_pem()?,
            pub_pem: public_key.to_pem()?,
        })
    }

    /// Decode the private key and check it matches the stored public key.
    pub fn keypair(&self) -> Result<Keypair> {
        let keypair = Keypair::from_pkcs8_pem(&self.priv_pem)?;
        let public_key = PublicKey::from_pem(&self.pub_pem)?;
        if keypair.public_key() != public_key {
            return Err(KeyError::InvalidState(format!(
                "key {}: public key does not match private key",
                self.id
            )));
        }
        Ok(keypair)
    }
}

impl std::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The full key state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyState {
    pub active_index: usize,
    pub keys: Vec<KeyRecord>,
}

impl KeyState {
    /// A state holding a single, active key.
    pub fn with_key(record: KeyRecord) -> Self {
        Self {
            active_index: 0,
            keys: vec![record],
        }
    }

    /// The active record.
    pub fn active(&self) -> Option<&KeyRecord> {
        self.keys.get(self.active_index)
    }

    /// A copy of this state with `record` appended and made active.
    pub fn rotated(&self, record: KeyRecord) -> Self {
        let mut keys = self.keys.clone();
        keys.push(record);
        Self {
            active_index: keys.len() - 1,
            keys,
        }
    }

    /// Check invariants and decode every keypair, in record order.
    pub fn decode(&self) -> Result<Vec<Keypair>> {
        if self.keys.is_empty() {
            return Err(KeyError::InvalidState("no keys".into()));
        }
        if self.active_index >= self.keys.len() {
            return Err(KeyError::InvalidState(format!(
                "activeIndex {} out of range for {} keys",
                self.active_index,
                self.keys.len()
            )));
        }
        self.keys.iter().map(KeyRecord::keypair).collect()
    }
}
