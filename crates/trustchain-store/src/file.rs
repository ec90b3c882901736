//! File-backed implementation of the LedgerStore trait.
//!
//! Layout under the data directory:
//!
//! | File | Contents | Write discipline |
//! |---|---|---|
//! | `ledger.wal.jsonl` | one JSON entry per line | append-only |
//! | `ledger.snapshot.json` | JSON array of all entries | atomic replace |
//! | `ledger.head.json` | JSON object of the last entry | atomic replace |

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};
use trustchain_core::LedgerEntry;

use crate::error::Result;
use crate::fs::atomic_write;
use crate::traits::{LedgerStore, Recovery, RecoverySource};

/// Write-ahead log file name.
pub const WAL_FILE: &str = "ledger.wal.jsonl";
/// Snapshot file name.
pub const SNAPSHOT_FILE: &str = "ledger.snapshot.json";
/// Head pointer file name.
pub const HEAD_FILE: &str = "ledger.head.json";

/// File-based store: WAL + snapshot + head pointer in one directory.
pub struct FileStore {
    dir: PathBuf,
    fsync: bool,
    /// Serializes log appends from this process.
    log_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            fsync: true,
            log_lock: Mutex::new(()),
        })
    }

    /// Enable or disable fsync after each write.
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the write-ahead log.
    pub fn wal_path(&self) -> PathBuf {
        self.dir.join(WAL_FILE)
    }

    /// Path of the snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// Path of the head pointer.
    pub fn head_path(&self) -> PathBuf {
        self.dir.join(HEAD_FILE)
    }

    fn load_snapshot(&self, path: &Path) -> Option<Vec<LedgerEntry>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "snapshot unreadable, falling back to log replay");
                return None;
            }
        };
        match serde_json::from_slice::<Vec<LedgerEntry>>(&raw) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(error = %e, "snapshot corrupt, falling back to log replay");
                None
            }
        }
    }

    fn replay_log(&self, path: &Path) -> Result<Recovery> {
        let raw = fs::read(path)?;
        // A crash mid-append can cut a multi-byte character in half
        let text = String::from_utf8_lossy(&raw);

        let mut entries = Vec::new();
        let mut skipped_lines = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(line = index + 1, error = %e, "skipping unparseable log record");
                    skipped_lines.push(index + 1);
                }
            }
        }

        Ok(Recovery {
            entries,
            source: RecoverySource::Log,
            skipped_lines,
        })
    }
}

impl LedgerStore for FileStore {
    fn load(&self) -> Result<Recovery> {
        let snapshot = self.snapshot_path();
        if snapshot.exists() {
            if let Some(entries) = self.load_snapshot(&snapshot) {
                debug!(length = entries.len(), "recovered from snapshot");
                return Ok(Recovery {
                    entries,
                    source: RecoverySource::Snapshot,
                    skipped_lines: Vec::new(),
                });
            }
        }

        let wal = self.wal_path();
        if wal.exists() {
            let recovery = self.replay_log(&wal)?;
            debug!(
                length = recovery.entries.len(),
                skipped = recovery.skipped_lines.len(),
                "recovered from log"
            );
            return Ok(recovery);
        }

        Ok(Recovery::empty())
    }

    fn log_mark(&self) -> Result<u64> {
        match fs::metadata(self.wal_path()) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn append_log(&self, entry: &LedgerEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self
            .log_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.wal_path())?;

        // Terminate a torn final record so this one starts on its own line
        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        file.write_all(&line)?;
        file.flush()?;
        if self.fsync {
            file.sync_data()?;
        }
        Ok(())
    }

    fn truncate_log(&self, mark: u64) -> Result<()> {
        let _guard = self
            .log_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let file = match OpenOptions::new().write(true).open(self.wal_path()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound && mark == 0 => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() > mark {
            file.set_len(mark)?;
            if self.fsync {
                file.sync_data()?;
            }
            warn!(mark, "log cut back after failed append");
        }
        Ok(())
    }

    fn write_snapshot(&self, entries: &[LedgerEntry]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        atomic_write(&self.snapshot_path(), &bytes, self.fsync)
    }

    fn write_head(&self, head: &LedgerEntry) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(head)?;
        atomic_write(&self.head_path(), &bytes, self.fsync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LedgerStoreExt;
    use trustchain_core::entry::now;
    use trustchain_core::Keypair;

    fn build(n: usize) -> Vec<LedgerEntry> {
        let keypair = Keypair::from_seed(&[0x11; 32]);
        let mut entries: Vec<LedgerEntry> = Vec::new();
        for i in 0..n {
            let canonical = format!(r#"{{"n":{i}}}"#);
            let sig = keypair.sign(canonical.as_bytes());
            let entry = LedgerEntry::next(entries.last(), canonical, sig, now());
            entries.push(entry);
        }
        entries
    }

    fn persist_all(store: &FileStore, entries: &[LedgerEntry]) {
        for i in 0..entries.len() {
            store.persist(&entries[i], &entries[..=i]).unwrap();
        }
    }

    #[test]
    fn test_empty_dir_recovers_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let recovery = store.load().unwrap();
        assert_eq!(recovery.source, RecoverySource::Empty);
        assert!(recovery.entries.is_empty());
    }

    #[test]
    fn test_persist_writes_all_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(3);
        persist_all(&store, &entries);

        let wal = fs::read_to_string(store.wal_path()).unwrap();
        assert_eq!(wal.lines().count(), 3);

        let snapshot: Vec<LedgerEntry> =
            serde_json::from_slice(&fs::read(store.snapshot_path()).unwrap()).unwrap();
        assert_eq!(snapshot, entries);

        let head: LedgerEntry =
            serde_json::from_slice(&fs::read(store.head_path()).unwrap()).unwrap();
        assert_eq!(head, entries[2]);

        let recovery = store.load().unwrap();
        assert_eq!(recovery.source, RecoverySource::Snapshot);
        assert_eq!(recovery.entries, entries);
    }

    #[test]
    fn test_log_replay_matches_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(4);
        persist_all(&store, &entries);

        let from_snapshot = store.load().unwrap().entries;
        fs::remove_file(store.snapshot_path()).unwrap();
        let recovery = store.load().unwrap();

        assert_eq!(recovery.source, RecoverySource::Log);
        assert_eq!(recovery.entries, from_snapshot);
    }

    #[test]
    fn test_truncated_final_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(2);
        persist_all(&store, &entries);
        fs::remove_file(store.snapshot_path()).unwrap();

        let mut wal = OpenOptions::new().append(true).open(store.wal_path()).unwrap();
        wal.write_all(br#"{"seq":2,"prevHash":"ab"#).unwrap();
        drop(wal);

        let recovery = store.load().unwrap();
        assert_eq!(recovery.entries, entries);
        assert_eq!(recovery.skipped_lines, vec![3]);
    }

    #[test]
    fn test_append_after_torn_record_starts_new_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(2);
        store.append_log(&entries[0]).unwrap();

        let mut wal = OpenOptions::new().append(true).open(store.wal_path()).unwrap();
        wal.write_all(b"{\"seq\":1,\"trunc").unwrap();
        drop(wal);

        store.append_log(&entries[1]).unwrap();
        let recovery = store.load().unwrap();
        assert_eq!(recovery.entries, entries);
        assert_eq!(recovery.skipped_lines, vec![2]);
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(3);
        persist_all(&store, &entries);

        fs::write(store.snapshot_path(), b"[{\"seq\":0,").unwrap();
        let recovery = store.load().unwrap();
        assert_eq!(recovery.source, RecoverySource::Log);
        assert_eq!(recovery.entries, entries);
    }

    #[test]
    fn test_replay_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(4);
        persist_all(&store, &entries);

        // A stray record claiming an earlier position is kept, not folded in
        let keypair = Keypair::from_seed(&[0x33; 32]);
        let forged = LedgerEntry::next(Some(&entries[1]), "\"forged\"", keypair.sign(b"\"forged\""), now());
        store.append_log(&forged).unwrap();
        fs::remove_file(store.snapshot_path()).unwrap();

        let recovered = store.load().unwrap().entries;
        assert_eq!(recovered.len(), 5);
        assert_eq!(&recovered[..4], &entries[..]);
        assert_eq!(recovered[4], forged);
    }

    #[test]
    fn test_truncate_log_restores_mark() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.log_mark().unwrap(), 0);
        store.truncate_log(0).unwrap();

        let entries = build(2);
        store.append_log(&entries[0]).unwrap();
        let mark = store.log_mark().unwrap();
        store.append_log(&entries[1]).unwrap();
        assert!(store.log_mark().unwrap() > mark);

        store.truncate_log(mark).unwrap();
        assert_eq!(store.log_mark().unwrap(), mark);
        let wal = fs::read_to_string(store.wal_path()).unwrap();
        assert_eq!(wal.lines().count(), 1);
    }

    #[test]
    fn test_failed_persist_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(3);
        persist_all(&store, &entries[..2]);
        let wal_before = fs::read(store.wal_path()).unwrap();

        // The snapshot write cannot rename over a directory
        let snapshot = store.snapshot_path();
        fs::remove_file(&snapshot).unwrap();
        fs::create_dir(&snapshot).unwrap();
        assert!(store.persist(&entries[2], &entries).is_err());
        fs::remove_dir(&snapshot).unwrap();

        assert_eq!(fs::read(store.wal_path()).unwrap(), wal_before);
        let recovery = store.load().unwrap();
        assert_eq!(recovery.source, RecoverySource::Log);
        assert_eq!(recovery.entries, &entries[..2]);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entries = build(1);
        store.append_log(&entries[0]).unwrap();
        let mut wal = OpenOptions::new().append(true).open(store.wal_path()).unwrap();
        wal.write_all(b"\n\n").unwrap();
        drop(wal);

        let recovery = store.load().unwrap();
        assert_eq!(recovery.entries.len(), 1);
        assert!(recovery.skipped_lines.is_empty());
    }
}
