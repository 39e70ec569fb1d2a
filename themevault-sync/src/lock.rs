//! Advisory single-writer lock on a workspace.
//!
//! `<workspace>/.themevault/lock` is created with `create_new`; it holds the
//! owner's pid and start time and is removed when the guard drops.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use themevault_core::paths;

use crate::error::{io_err, SyncError};

#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
}

impl WorkspaceLock {
    /// Take the lock or fail with [`SyncError::Locked`].
    pub fn acquire(workspace: &Path) -> Result<Self, SyncError> {
        let dir = paths::reserved_dir(workspace);
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let path = paths::lock_path(workspace);
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SyncError::Locked { path });
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        let lock = Self { path };
        writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339())
            .map_err(|e| io_err(&lock.path, e))?;
        tracing::debug!("acquired {}", lock.path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("could not release {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_is_locked_until_release() {
        let tmp = TempDir::new().expect("workspace");
        let first = WorkspaceLock::acquire(tmp.path()).expect("first");
        assert!(matches!(
            WorkspaceLock::acquire(tmp.path()),
            Err(SyncError::Locked { .. })
        ));
        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
        WorkspaceLock::acquire(tmp.path()).expect("reacquire");
    }

    #[test]
    fn lock_file_records_pid() {
        let tmp = TempDir::new().expect("workspace");
        let lock = WorkspaceLock::acquire(tmp.path()).expect("lock");
        let contents = std::fs::read_to_string(lock.path()).expect("read");
        assert!(contents.starts_with(&std::process::id().to_string()));
    }
}
