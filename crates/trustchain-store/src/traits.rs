//! LedgerStore trait: the abstract interface for ledger durability.
//!
//! The ledger keeps its working set in memory; a store only has to make
//! each append durable and hand the sequence back on restart.

use trustchain_core::LedgerEntry;

use crate::error::Result;

/// Where a recovered sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySource {
    /// Parsed from the snapshot (authoritative when readable).
    Snapshot,
    /// Replayed from the write-ahead log.
    Log,
    /// Nothing on disk: fresh ledger.
    Empty,
}

/// The result of rebuilding a ledger from durable storage.
#[derive(Debug, Clone)]
pub struct Recovery {
    /// Recovered entries in order.
    pub entries: Vec<LedgerEntry>,
    /// Which representation they were read from.
    pub source: RecoverySource,
    /// 1-based WAL line numbers that failed to parse and were skipped.
    pub skipped_lines: Vec<usize>,
}

impl Recovery {
    /// A fresh, empty ledger.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            source: RecoverySource::Empty,
            skipped_lines: Vec::new(),
        }
    }
}

/// The LedgerStore trait: blocking interface for ledger persistence.
///
/// All methods are blocking; async callers run them on `spawn_blocking`.
/// Only the ledger's single writer may call the mutating methods.
///
/// # Durability contract
///
/// - `append_log` appends exactly one record and never rewrites earlier ones.
/// - `truncate_log` only ever cuts back to a mark taken by the same writer
///   before an append that did not complete.
/// - `write_snapshot` replaces the previous snapshot atomically: a crash at
///   any point leaves either the old or the new snapshot, never a torn one.
/// - `write_head` overwrites the head pointer; it is derived data.
pub trait LedgerStore: Send + Sync + 'static {
    /// Rebuild the sequence from durable storage.
    fn load(&self) -> Result<Recovery>;

    /// Current end of the write-ahead log, for a later `truncate_log`.
    fn log_mark(&self) -> Result<u64>;

    /// Durably append one entry to the write-ahead log.
    fn append_log(&self, entry: &LedgerEntry) -> Result<()>;

    /// Cut the write-ahead log back to `mark`.
    fn truncate_log(&self, mark: u64) -> Result<()>;

    /// Atomically replace the snapshot with `entries`.
    fn write_snapshot(&self, entries: &[LedgerEntry]) -> Result<()>;

    /// Overwrite the head pointer.
    fn write_head(&self, head: &LedgerEntry) -> Result<()>;
}

/// Extension trait for common store patterns.
pub trait LedgerStoreExt: LedgerStore {
    /// Run every durability step for a newly appended entry.
    ///
    /// `entries` must already end with `entry`. When any step fails the
    /// log is cut back and the previous snapshot restored, so a failed
    /// append leaves nothing behind for recovery to find.
    fn persist(&self, entry: &LedgerEntry, entries: &[LedgerEntry]) -> Result<()>;
}

impl<S: LedgerStore + ?Sized> LedgerStoreExt for S {
    fn persist(&self, entry: &LedgerEntry, entries: &[LedgerEntry]) -> Result<()> {
        let mark = self.log_mark()?;
        let result = self
            .append_log(entry)
            .and_then(|()| self.write_snapshot(entries))
            .and_then(|()| self.write_head(entry));

        if result.is_err() {
            let previous = &entries[..entries.len().saturating_sub(1)];
            if let Err(e) = self.truncate_log(mark) {
                tracing::error!(seq = entry.seq, mark, error = %e, "failed to cut back log");
            }
            if let Err(e) = self.write_snapshot(previous) {
                tracing::error!(seq = entry.seq, error = %e, "failed to restore snapshot");
            }
        }
        result
    }
}
