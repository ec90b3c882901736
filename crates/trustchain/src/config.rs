//! Runtime configuration for the ledger and the signer.

use std::path::PathBuf;

/// Configuration for [`Ledger::open`](crate::Ledger::open).
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Directory holding the WAL, snapshot and head pointer.
    pub data_dir: PathBuf,
    /// Whether to fsync after each durability step.
    pub fsync: bool,
    /// Capacity of the worker's command queue.
    pub command_buffer: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            fsync: true,
            command_buffer: 64,
        }
    }
}

/// Configuration for the key custodian.
#[derive(Debug, Clone)]
pub struct SignerConfig {
    /// Key-state file.
    pub key_file: PathBuf,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from("keys/keystate.json"),
        }
    }
}

impl SignerConfig {
    /// Open (creating on first use) the custodian described by this config.
    pub fn open(&self) -> trustchain_keys::Result<trustchain_keys::KeyCustodian> {
        trustchain_keys::KeyCustodian::open(&self.key_file)
    }
}
