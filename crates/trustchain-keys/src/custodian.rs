//! KeyCustodian: owns the key state, signs payloads, rotates keys.
//!
//! Signing and verification are pure CPU work and never touch storage.
//! Only `open` (first-use generation) and `rotate` write the key-state file,
//! always through an atomic replace. Rotations are serialized on their own
//! mutex so the state lock is only taken for the in-memory swap, and signers
//! never wait on disk I/O.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::info;

use trustchain_core::{
    canonicalize, content_hash, CanonicalValue, Keypair, PublicKey, Sha256Hash, Signature,
};
use trustchain_store::{atomic_write, fs::parent_dir};

use crate::error::{KeyError, Result};
use crate::state::{KeyRecord, KeyState};

/// The result of signing a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Canonical form of the payload (the signed bytes).
    pub canonical: String,
    /// SHA-256 of `canonical`.
    pub hash: Sha256Hash,
    /// Signature over `canonical` by the active key.
    pub signature: Signature,
    /// Id of the key that produced `signature`.
    pub key_id: String,
}

/// Public view of one custodian key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub id: String,
    pub public_key_pem: String,
    pub active: bool,
}

/// Outcome of a rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedKey {
    pub id: String,
    pub public_key_pem: String,
}

struct Loaded {
    state: KeyState,
    keypairs: Vec<Keypair>,
}

impl Loaded {
    fn new(state: KeyState) -> Result<Self> {
        let keypairs = state.decode()?;
        Ok(Self { state, keypairs })
    }

    fn active(&self) -> (&KeyRecord, &Keypair) {
        let i = self.state.active_index;
        (&self.state.keys[i], &self.keypairs[i])
    }
}

/// The key custodian.
///
/// Construct once per process with [`KeyCustodian::open`] and share it
/// behind an `Arc`.
pub struct KeyCustodian {
    path: PathBuf,
    fsync: bool,
    inner: RwLock<Loaded>,
    rotation: Mutex<()>,
}

impl KeyCustodian {
    /// Load the key state at `path`, generating and persisting a first key
    /// if no state exists yet.
    ///
    /// Re-opening an existing state is a plain load.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Like [`open`](Self::open) with explicit fsync behavior.
    pub fn open_with(path: impl AsRef<Path>, fsync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice::<KeyState>(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let state = KeyState::with_key(KeyRecord::from_keypair(&Keypair::generate())?);
                std::fs::create_dir_all(parent_dir(&path))?;
                persist(&path, &state, fsync)?;
                info!(key_id = %state.keys[0].id, "generated initial signing key");
                state
            }
            Err(e) => return Err(e.into()),
        };

        let loaded = Loaded::new(state)?;
        info!(
            keys = loaded.state.keys.len(),
            active = %loaded.active().0.id,
            "key state loaded"
        );
        Ok(Self {
            path,
            fsync,
            inner: RwLock::new(loaded),
            rotation: Mutex::new(()),
        })
    }

    /// Path of the key-state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The active public key.
    pub fn active_public_key(&self) -> PublicKey {
        self.read().active().1.public_key()
    }

    /// The active public key as SPKI PEM.
    pub fn active_public_key_pem(&self) -> String {
        self.read().active().0.pub_pem.clone()
    }

    /// Id of the active key.
    pub fn active_key_id(&self) -> String {
        self.read().active().0.id.clone()
    }

    /// Canonicalize `payload`, hash it and sign the canonical bytes.
    pub fn sign(&self, payload: &CanonicalValue) -> SignedPayload {
        let canonical = canonicalize(payload);
        let hash = content_hash(&canonical);
        let inner = self.read();
        let (record, keypair) = inner.active();
        let signature = keypair.sign(canonical.as_bytes());
        SignedPayload {
            canonical,
            hash,
            signature,
            key_id: record.id.clone(),
        }
    }

    /// Sign an arbitrary JSON payload.
    pub fn sign_json(&self, payload: &serde_json::Value) -> SignedPayload {
        self.sign(&CanonicalValue::from(payload))
    }

    /// Check a base64 signature over `canonical` against a PEM public key.
    ///
    /// Never errors: malformed input yields `false`.
    pub fn verify(&self, canonical: &str, signature_b64: &str, public_key_pem: &str) -> bool {
        trustchain_core::verify(canonical, signature_b64, public_key_pem)
    }

    /// Check a signature against the active key.
    pub fn verify_with_active(&self, canonical: &str, signature_b64: &str) -> bool {
        let pem = self.active_public_key_pem();
        self.verify(canonical, signature_b64, &pem)
    }

    /// Generate a new key, append it, make it active and persist.
    ///
    /// If persistence fails the in-memory state is left unchanged.
    pub fn rotate(&self) -> Result<RotatedKey> {
        let keypair = Keypair::generate();
        let record = KeyRecord::from_keypair(&keypair)?;

        let _rotating = self.rotation.lock().unwrap_or_else(|p| p.into_inner());
        let next = self.read().state.rotated(record.clone());
        persist(&self.path, &next, self.fsync)?;

        let mut inner = self.write();
        inner.state = next;
        inner.keypairs.push(keypair);
        info!(key_id = %record.id, keys = inner.state.keys.len(), "rotated signing key");

        Ok(RotatedKey {
            id: record.id,
            public_key_pem: record.pub_pem,
        })
    }

    /// Every key the custodian has held, oldest first.
    pub fn keys(&self) -> Vec<KeyInfo> {
        let inner = self.read();
        inner
            .state
            .keys
            .iter()
            .enumerate()
            .map(|(i, record)| KeyInfo {
                id: record.id.clone(),
                public_key_pem: record.pub_pem.clone(),
                active: i == inner.state.active_index,
            })
            .collect()
    }

    /// Id of the custodian key matching `public_key_pem`, if any.
    pub fn find_key(&self, public_key_pem: &str) -> Option<String> {
        let wanted = PublicKey::from_pem(public_key_pem).ok()?;
        let inner = self.read();
        inner
            .keypairs
            .iter()
            .position(|kp| kp.public_key() == wanted)
            .map(|i| inner.state.keys[i].id.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, Loaded> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Loaded> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl std::fmt::Debug for KeyCustodian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCustodian")
            .field("path", &self.path)
            .field("active", &self.active_key_id())
            .finish_non_exhaustive()
    }
}

fn persist(path: &Path, state: &KeyState, fsync: bool) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    atomic_write(path, &bytes, fsync).map_err(KeyError::from)
}
