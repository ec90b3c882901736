//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a temporary directory holding a
//! key custodian and a file-backed ledger.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use trustchain::{Appended, KeyCustodian, Ledger, LedgerConfig, Result};
use trustchain_store::file::{SNAPSHOT_FILE, WAL_FILE};

/// A custodian and a ledger rooted in a temporary directory.
pub struct TestFixture {
    pub dir: TempDir,
    pub custodian: Arc<KeyCustodian>,
    pub ledger: Ledger,
    pub config: LedgerConfig,
}

impl TestFixture {
    /// Create a fresh fixture. fsync is off to keep tests fast.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::open_with(dir.path().join("keys.json"), false).unwrap();
        let config = LedgerConfig {
            data_dir: dir.path().join("data"),
            fsync: false,
            command_buffer: 16,
        };
        let ledger = Ledger::open(&config).await.unwrap();
        Self {
            dir,
            custodian: Arc::new(custodian),
            ledger,
            config,
        }
    }

    /// Sign `payload` with the active key and append it.
    pub async fn append(&self, payload: &Value) -> Result<Appended> {
        let signed = self.custodian.sign_json(payload);
        self.ledger
            .append(
                signed.canonical,
                &signed.signature.to_base64(),
                &self.custodian.active_public_key_pem(),
            )
            .await
    }

    /// Open a second ledger over the same data directory, as after a restart.
    pub async fn reopen(&self) -> Ledger {
        Ledger::open(&self.config).await.unwrap()
    }

    pub fn wal_path(&self) -> PathBuf {
        self.config.data_dir.join(WAL_FILE)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config.data_dir.join(SNAPSHOT_FILE)
    }

    /// Rewrite the snapshot, applying `edit` to the parsed entries.
    pub fn edit_snapshot(&self, edit: impl FnOnce(&mut Vec<trustchain::LedgerEntry>)) {
        let path = self.snapshot_path();
        let mut entries: Vec<trustchain::LedgerEntry> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        edit(&mut entries);
        std::fs::write(&path, serde_json::to_vec_pretty(&entries).unwrap()).unwrap();
    }
}
