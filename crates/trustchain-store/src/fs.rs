//! Filesystem helpers shared by the ledger and key-state files.

use std::io::Write;
use std::path::Path;

use crate::error::{Result, StoreError};

/// Replace `path` with `bytes` atomically.
///
/// Writes to a temporary file in the same directory, optionally fsyncs it,
/// then renames it over `path`. Readers observe either the previous
/// contents or the new contents. The temporary file is created with mode
/// `0600` on Unix and the rename keeps that mode.
pub fn atomic_write(path: &Path, bytes: &[u8], fsync: bool) -> Result<()> {
    let dir = parent_dir(path);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    if fsync {
        tmp.as_file().sync_all()?;
    }
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    if fsync {
        sync_dir(dir)?;
    }
    Ok(())
}

/// Parent directory of `path`, or `.` for bare file names.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Persist a directory entry change (rename) on platforms that support it.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
