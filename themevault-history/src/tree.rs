//! Working-tree primitives.
//!
//! The working tree is the workspace directory. Every regular file whose
//! path has no dot-prefixed component (which excludes `.themevault/`) is a
//! tracked item keyed by its slash-joined relative path.
//!
//! Writes use `<path>.themevault.tmp` + rename, so a crash never leaves a
//! half-written item behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use themevault_core::ItemKey;

use crate::error::{io_err, HistoryError};

const TMP_SUFFIX: &str = ".themevault.tmp";

/// Every tracked file under `root`, keyed by item key.
pub fn scan(root: &Path) -> Result<BTreeMap<ItemKey, PathBuf>, HistoryError> {
    let mut found = BTreeMap::new();
    scan_dir(root, root, &mut found)?;
    Ok(found)
}

fn scan_dir(
    root: &Path,
    dir: &Path,
    found: &mut BTreeMap<ItemKey, PathBuf>,
) -> Result<(), HistoryError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::warn!("skipping non UTF-8 path under {}", dir.display());
            continue;
        };
        if name.starts_with('.') || name.ends_with(TMP_SUFFIX) {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            scan_dir(root, &path, found)?;
        } else if file_type.is_file() {
            let key = key_for(root, &path)?;
            found.insert(key, path);
        }
    }
    Ok(())
}

fn key_for(root: &Path, path: &Path) -> Result<ItemKey, HistoryError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(ItemKey::new(joined)?)
}

/// Read one item's bytes; `None` if the file does not exist.
pub fn read(root: &Path, key: &ItemKey) -> Result<Option<Vec<u8>>, HistoryError> {
    let path = key.to_path(root);
    match std::fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(&path, e)),
    }
}

/// Atomically write one item, creating parent directories.
///
/// Returns `false` without touching the file when the content is unchanged.
pub fn write(root: &Path, key: &ItemKey, bytes: &[u8]) -> Result<bool, HistoryError> {
    let path = key.to_path(root);
    if read(root, key)?.as_deref() == Some(bytes) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::debug!("wrote: {key}");
    Ok(true)
}

/// Remove one item and any directories left empty, up to `root`.
///
/// Returns `false` if the file did not exist.
pub fn remove(root: &Path, key: &ItemKey) -> Result<bool, HistoryError> {
    let path = key.to_path(root);
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(io_err(&path, e)),
    }
    let mut dir = path.parent();
    while let Some(d) = dir {
        if d == root || !d.starts_with(root) {
            break;
        }
        // Stops at the first non-empty directory.
        if std::fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
    tracing::debug!("removed: {key}");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(s: &str) -> ItemKey {
        ItemKey::new(s).unwrap()
    }

    #[test]
    fn scan_skips_reserved_and_dot_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, &key("sections/header.liquid"), b"h").unwrap();
        write(root, &key("assets/base.css"), b"c").unwrap();
        std::fs::create_dir_all(root.join(".themevault/history")).unwrap();
        std::fs::write(root.join(".themevault/config.yaml"), "secret").unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref").unwrap();
        std::fs::write(root.join("assets/.DS_Store"), "x").unwrap();
        std::fs::write(root.join("assets/base.css.themevault.tmp"), "partial").unwrap();

        let keys: Vec<String> = scan(root)
            .unwrap()
            .into_keys()
            .map(String::from)
            .collect();
        assert_eq!(keys, vec!["assets/base.css", "sections/header.liquid"]);
    }

    #[test]
    fn write_skips_identical_content() {
        let tmp = TempDir::new().unwrap();
        assert!(write(tmp.path(), &key("a/b.css"), b"x").unwrap());
        assert!(!write(tmp.path(), &key("a/b.css"), b"x").unwrap());
        assert!(write(tmp.path(), &key("a/b.css"), b"y").unwrap());
        assert_eq!(read(tmp.path(), &key("a/b.css")).unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn remove_prunes_empty_parents_only() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, &key("a/b/c.liquid"), b"1").unwrap();
        write(root, &key("a/keep.liquid"), b"2").unwrap();
        assert!(remove(root, &key("a/b/c.liquid")).unwrap());
        assert!(!root.join("a/b").exists());
        assert!(root.join("a/keep.liquid").exists());
        assert!(!remove(root, &key("a/b/c.liquid")).unwrap());
        assert!(root.exists());
    }

    #[test]
    fn read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read(tmp.path(), &key("nope.css")).unwrap(), None);
    }
}
