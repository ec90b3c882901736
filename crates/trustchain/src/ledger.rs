//! The Ledger: a single-writer, hash-linked, durable append log.
//!
//! [`Ledger`] is a cheap, cloneable handle. Mutations (`append`, `reload`)
//! are sent to one worker task over an mpsc queue and applied strictly in
//! arrival order. The worker publishes an immutable `Arc<Vec<LedgerEntry>>`
//! view only after every durability step has succeeded, so reads never
//! block on writes and never observe an entry that is not on disk.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use trustchain_core::entry::now;
use trustchain_core::{content_hash, verify_chain, ChainReport, LedgerEntry, PublicKey, Signature};
use trustchain_store::{FileStore, LedgerStore, LedgerStoreExt, RecoverySource};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

type View = Arc<RwLock<Arc<Vec<LedgerEntry>>>>;

/// Outcome of an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// The new head, or the existing head for an idempotent hit.
    pub entry: LedgerEntry,
    /// `false` when the payload matched the head and nothing was written.
    pub created: bool,
}

/// Outcome of a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reloaded {
    pub length: usize,
    pub source: RecoverySource,
    /// Number of WAL lines skipped as unparseable.
    pub skipped_lines: usize,
}

/// Coarse health derived from chain verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: HealthStatus,
    pub length: usize,
}

enum Command {
    Append {
        canonical: String,
        signature: Signature,
        reply: oneshot::Sender<Result<Appended>>,
    },
    Reload {
        reply: oneshot::Sender<Result<Reloaded>>,
    },
}

/// Handle to a running ledger.
#[derive(Clone)]
pub struct Ledger {
    commands: mpsc::Sender<Command>,
    view: View,
}

impl Ledger {
    /// Open the file-backed ledger described by `config` and start its worker.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(config: &LedgerConfig) -> Result<Self> {
        let store = FileStore::open(&config.data_dir)
            .map_err(LedgerError::Recovery)?
            .with_fsync(config.fsync);
        Self::with_store(Arc::new(store), config.command_buffer).await
    }

    /// Recover from `store` and start a worker that owns it.
    pub async fn with_store<S: LedgerStore>(store: Arc<S>, command_buffer: usize) -> Result<Self> {
        let store: Arc<dyn LedgerStore> = store;
        let (entries, _) = load(&store).await?;

        let current = Arc::new(entries);
        let view: View = Arc::new(RwLock::new(current.clone()));
        let (tx, rx) = mpsc::channel(command_buffer.max(1));

        let worker = Worker {
            store,
            current,
            view: view.clone(),
        };
        tokio::spawn(worker.run(rx));

        Ok(Self { commands: tx, view })
    }

    /// Verify `signature` over `canonical` under `public_key_pem`, then append.
    ///
    /// If the head already carries the same content hash the head is
    /// returned unchanged, which makes client retries safe.
    pub async fn append(
        &self,
        canonical: impl Into<String>,
        signature_b64: &str,
        public_key_pem: &str,
    ) -> Result<Appended> {
        let canonical = canonical.into();
        let signature = check_signature(&canonical, signature_b64, public_key_pem)?;

        let (reply, rx) = oneshot::channel();
        self.send(Command::Append {
            canonical,
            signature,
            reply,
        })
        .await?;
        rx.await.map_err(|_| LedgerError::Unavailable)?
    }

    /// Discard in-memory state and rebuild it from durable storage.
    pub async fn reload(&self) -> Result<Reloaded> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reload { reply }).await?;
        rx.await.map_err(|_| LedgerError::Unavailable)?
    }

    /// The most recent entry.
    pub fn head(&self) -> Option<LedgerEntry> {
        self.snapshot().last().cloned()
    }

    /// A consistent view of every entry.
    pub fn all(&self) -> Arc<Vec<LedgerEntry>> {
        self.snapshot()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Walk the whole chain and report every inconsistency.
    pub fn verify(&self) -> ChainReport {
        verify_chain(&self.snapshot())
    }

    pub fn health(&self) -> Health {
        let report = self.verify();
        Health {
            status: if report.ok {
                HealthStatus::Ok
            } else {
                HealthStatus::Degraded
            },
            length: report.length,
        }
    }

    /// Whether the worker is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn snapshot(&self) -> Arc<Vec<LedgerEntry>> {
        self.view
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LedgerError::Unavailable)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("length", &self.len())
            .field("running", &self.is_running())
            .finish()
    }
}

fn check_signature(canonical: &str, signature_b64: &str, public_key_pem: &str) -> Result<Signature> {
    let signature = Signature::from_base64(signature_b64).map_err(|_| LedgerError::SignatureInvalid)?;
    let public_key = PublicKey::from_pem(public_key_pem).map_err(|_| LedgerError::SignatureInvalid)?;
    public_key
        .verify(canonical.as_bytes(), &signature)
        .map_err(|_| LedgerError::SignatureInvalid)?;
    Ok(signature)
}

async fn load(store: &Arc<dyn LedgerStore>) -> Result<(Vec<LedgerEntry>, Reloaded)> {
    let store = store.clone();
    let recovery = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|_| LedgerError::Unavailable)?
        .map_err(LedgerError::Recovery)?;

    if !recovery.skipped_lines.is_empty() {
        warn!(lines = ?recovery.skipped_lines, "skipped unparseable log records during recovery");
    }
    let report = Reloaded {
        length: recovery.entries.len(),
        source: recovery.source,
        skipped_lines: recovery.skipped_lines.len(),
    };
    info!(length = report.length, source = ?report.source, "ledger recovered");
    Ok((recovery.entries, report))
}

struct Worker {
    store: Arc<dyn LedgerStore>,
    current: Arc<Vec<LedgerEntry>>,
    view: View,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Append {
                    canonical,
                    signature,
                    reply,
                } => {
                    let result = self.append(canonical, signature).await;
                    let _ = reply.send(result);
                }
                Command::Reload { reply } => {
                    let result = self.reload().await;
                    let _ = reply.send(result);
                }
            }
        }
        debug!("ledger worker stopped");
    }

    async fn append(&mut self, canonical: String, signature: Signature) -> Result<Appended> {
        let hash = content_hash(&canonical);
        let head = self.current.last();

        if let Some(head) = head.filter(|h| h.content_hash == hash) {
            debug!(seq = head.seq, content_hash = %hash, "idempotent append");
            return Ok(Appended {
                entry: head.clone(),
                created: false,
            });
        }

        let entry = LedgerEntry::next(head, canonical, signature, now());
        let mut next = Vec::with_capacity(self.current.len() + 1);
        next.extend_from_slice(&self.current);
        next.push(entry.clone());
        let next = Arc::new(next);

        let store = self.store.clone();
        let (record, entries) = (entry.clone(), next.clone());
        let persisted = tokio::task::spawn_blocking(move || store.persist(&record, &entries))
            .await
            .map_err(|_| LedgerError::Unavailable)?;

        if let Err(e) = persisted {
            error!(seq = entry.seq, error = %e, "append not persisted, rolled back");
            return Err(LedgerError::Persist(e));
        }

        self.publish(next);
        info!(seq = entry.seq, content_hash = %entry.content_hash, "appended");
        Ok(Appended {
            entry,
            created: true,
        })
    }

    async fn reload(&mut self) -> Result<Reloaded> {
        let (entries, report) = load(&self.store).await?;
        self.publish(Arc::new(entries));
        info!(length = report.length, "reloaded");
        Ok(report)
    }

    fn publish(&mut self, entries: Arc<Vec<LedgerEntry>>) {
        self.current = entries.clone();
        *self
            .view
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = entries;
    }
}
