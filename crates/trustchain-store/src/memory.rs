//! In-memory implementation of the LedgerStore trait.
//!
//! This is primarily for testing. Records are kept in their serialized form
//! so recovery exercises the same parse path as the file store, and any
//! durability step can be made to fail on demand.

use std::io;
use std::sync::Mutex;

use trustchain_core::LedgerEntry;

use crate::error::{Result, StoreError};
use crate::traits::{LedgerStore, Recovery, RecoverySource};

/// A durability step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    AppendLog,
    WriteSnapshot,
    WriteHead,
}

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via Mutex.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// WAL lines, one serialized entry each.
    log: Vec<String>,
    /// Serialized snapshot array.
    snapshot: Option<String>,
    /// Serialized head entry.
    head: Option<String>,
    /// Steps that fail on their next call.
    fail_once: Vec<FailPoint>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `point` fail with an I/O error.
    pub fn fail_next(&self, point: FailPoint) {
        self.lock().fail_once.push(point);
    }

    /// Number of WAL records written.
    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    /// Raw WAL lines.
    pub fn log_lines(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Raw head pointer.
    pub fn head_raw(&self) -> Option<String> {
        self.lock().head.clone()
    }

    /// Drop the snapshot so the next load replays the log.
    pub fn clear_snapshot(&self) {
        self.lock().snapshot = None;
    }

    /// Rewrite the stored snapshot in place.
    pub fn tamper_snapshot(&self, f: impl FnOnce(&mut Vec<LedgerEntry>)) -> Result<()> {
        let mut inner = self.lock();
        let raw = inner
            .snapshot
            .as_deref()
            .ok_or_else(|| StoreError::InvalidData("no snapshot".into()))?;
        let mut entries: Vec<LedgerEntry> = serde_json::from_str(raw)?;
        f(&mut entries);
        inner.snapshot = Some(serde_json::to_string(&entries)?);
        Ok(())
    }

    /// Append a raw line to the WAL (e.g. a torn record).
    pub fn push_raw_log_line(&self, line: impl Into<String>) {
        self.lock().log.push(line.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryStoreInner {
    fn check(&mut self, point: FailPoint) -> Result<()> {
        if let Some(pos) = self.fail_once.iter().position(|p| *p == point) {
            self.fail_once.remove(pos);
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("injected failure at {point:?}"),
            )));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Recovery> {
        let inner = self.lock();

        if let Some(raw) = &inner.snapshot {
            if let Ok(entries) = serde_json::from_str::<Vec<LedgerEntry>>(raw) {
                return Ok(Recovery {
                    entries,
                    source: RecoverySource::Snapshot,
                    skipped_lines: Vec::new(),
                });
            }
        }

        if inner.log.is_empty() {
            return Ok(Recovery::empty());
        }

        let mut entries = Vec::new();
        let mut skipped_lines = Vec::new();
        for (index, line) in inner.log.iter().enumerate() {
            match serde_json::from_str::<LedgerEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(_) => skipped_lines.push(index + 1),
            }
        }
        Ok(Recovery {
            entries,
            source: RecoverySource::Log,
            skipped_lines,
        })
    }

    fn log_mark(&self) -> Result<u64> {
        Ok(self.lock().log.len() as u64)
    }

    fn append_log(&self, entry: &LedgerEntry) -> Result<()> {
        let mut inner = self.lock();
        inner.check(FailPoint::AppendLog)?;
        let line = serde_json::to_string(entry)?;
        inner.log.push(line);
        Ok(())
    }

    fn truncate_log(&self, mark: u64) -> Result<()> {
        self.lock().log.truncate(mark as usize);
        Ok(())
    }

    fn write_snapshot(&self, entries: &[LedgerEntry]) -> Result<()> {
        let mut inner = self.lock();
        inner.check(FailPoint::WriteSnapshot)?;
        inner.snapshot = Some(serde_json::to_string(entries)?);
        Ok(())
    }

    fn write_head(&self, head: &LedgerEntry) -> Result<()> {
        let mut inner = self.lock();
        inner.check(FailPoint::WriteHead)?;
        inner.head = Some(serde_json::to_string(head)?);
        Ok(())
    }
}
