//! Content-addressed blob storage.
//!
//! Blobs live at `objects/<first two hex chars>/<remaining hex>` and are
//! written with the `.tmp` + rename pattern. Writing a blob that already
//! exists is a no-op.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, HistoryError};

/// SHA-256 hex digest of `bytes`.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[derive(Debug, Clone)]
pub struct ObjectStore {
    dir: PathBuf,
}

impl ObjectStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_of(&self, hash: &str) -> PathBuf {
        let (fanout, rest) = hash.split_at(2.min(hash.len()));
        self.dir.join(fanout).join(rest)
    }

    /// Store `bytes`, returning their hash.
    pub fn put(&self, bytes: &[u8]) -> Result<String, HistoryError> {
        let hash = hash_bytes(bytes);
        let path = self.path_of(&hash);
        if path.exists() {
            return Ok(hash);
        }
        write_atomic(&path, bytes)?;
        tracing::trace!("stored object {hash}");
        Ok(hash)
    }

    /// Load the blob for `hash`, verifying its content.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>, HistoryError> {
        let path = self.path_of(hash);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HistoryError::CorruptObject {
                    hash: hash.to_string(),
                })
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        if hash_bytes(&bytes) != hash {
            return Err(HistoryError::CorruptObject {
                hash: hash.to_string(),
            });
        }
        Ok(bytes)
    }
}

/// Write `bytes` to `<path>.tmp` and rename into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), HistoryError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
