//! Tree-to-tree comparison.

use std::collections::BTreeMap;
use std::fmt;

use similar::{ChangeTag, TextDiff};

use themevault_core::{ItemKey, MediaKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Insertions and deletions of a text change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub insertions: usize,
    pub deletions: usize,
}

/// One differing item between two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub key: ItemKey,
    pub status: ChangeStatus,
    pub before: Option<Vec<u8>>,
    pub after: Option<Vec<u8>>,
}

impl FileChange {
    /// Both sides (where present) as text, or `None` for binary content.
    fn texts(&self) -> Option<(&str, &str)> {
        if MediaKind::from_key(&self.key).is_binary() {
            return None;
        }
        fn side(b: &Option<Vec<u8>>) -> Option<&str> {
            match b {
                Some(bytes) => std::str::from_utf8(bytes).ok(),
                None => Some(""),
            }
        }
        Some((side(&self.before)?, side(&self.after)?))
    }

    pub fn is_binary(&self) -> bool {
        self.texts().is_none()
    }

    /// Line counts for text changes; `None` for binary content.
    pub fn line_stats(&self) -> Option<LineStats> {
        let (before, after) = self.texts()?;
        let mut stats = LineStats::default();
        for change in TextDiff::from_lines(before, after).iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => stats.insertions += 1,
                ChangeTag::Delete => stats.deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        Some(stats)
    }

    /// Unified diff with `a/` / `b/` headers and three lines of context.
    pub fn unified(&self) -> String {
        let old_header = format!("a/{}", self.key);
        let new_header = format!("b/{}", self.key);
        match self.texts() {
            Some((before, after)) => TextDiff::from_lines(before, after)
                .unified_diff()
                .header(&old_header, &new_header)
                .context_radius(3)
                .to_string(),
            None => format!("Binary files {old_header} and {new_header} differ\n"),
        }
    }
}

/// Changes turning `before` into `after`, sorted by key.
pub fn compare(
    before: &BTreeMap<ItemKey, Vec<u8>>,
    after: &BTreeMap<ItemKey, Vec<u8>>,
) -> Vec<FileChange> {
    let mut changes = Vec::new();
    for (key, old) in before {
        match after.get(key) {
            None => changes.push(FileChange {
                key: key.clone(),
                status: ChangeStatus::Deleted,
                before: Some(old.clone()),
                after: None,
            }),
            Some(new) if new != old => changes.push(FileChange {
                key: key.clone(),
                status: ChangeStatus::Modified,
                before: Some(old.clone()),
                after: Some(new.clone()),
            }),
            Some(_) => {}
        }
    }
    for (key, new) in after {
        if !before.contains_key(key) {
            changes.push(FileChange {
                key: key.clone(),
                status: ChangeStatus::Added,
                before: None,
                after: Some(new.clone()),
            });
        }
    }
    changes.sort_by(|a, b| a.key.cmp(&b.key));
    changes
}
