//! Checkpoint records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use themevault_core::ItemKey;

use crate::objects::hash_bytes;

/// Content hash identifying a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(pub String);

impl CheckpointId {
    /// First 12 hex characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable snapshot of a tree: item key → blob hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub parent: Option<CheckpointId>,
    pub created_at: DateTime<Utc>,
    pub message: String,
    pub files: BTreeMap<ItemKey, String>,
}

#[derive(Serialize)]
struct IdInput<'a> {
    parent: &'a Option<CheckpointId>,
    created_at: &'a DateTime<Utc>,
    message: &'a str,
    files: &'a BTreeMap<ItemKey, String>,
}

impl Checkpoint {
    pub fn new(
        parent: Option<CheckpointId>,
        message: impl Into<String>,
        files: BTreeMap<ItemKey, String>,
    ) -> Self {
        let created_at = Utc::now();
        let message = message.into();
        let input = IdInput {
            parent: &parent,
            created_at: &created_at,
            message: &message,
            files: &files,
        };
        // BTreeMap keeps the serialized form canonical.
        let canonical = serde_json::to_vec(&input).unwrap_or_default();
        let id = CheckpointId(hash_bytes(&canonical));
        Self {
            id,
            parent,
            created_at,
            message,
            files,
        }
    }

    /// Same files, regardless of id, parent or message.
    pub fn same_tree(&self, files: &BTreeMap<ItemKey, String>) -> bool {
        &self.files == files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(pairs: &[(&str, &str)]) -> BTreeMap<ItemKey, String> {
        pairs
            .iter()
            .map(|(k, h)| (ItemKey::new(*k).unwrap(), h.to_string()))
            .collect()
    }

    #[test]
    fn id_depends_on_parent() {
        let a = Checkpoint::new(None, "m", files(&[("a.css", "1")]));
        let b = Checkpoint::new(Some(a.id.clone()), "m", files(&[("a.css", "1")]));
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.0.len(), 64);
        assert_eq!(a.id.short().len(), 12);
    }

    #[test]
    fn json_roundtrip_keeps_keys() {
        let cp = Checkpoint::new(None, "first", files(&[("sections/header.liquid", "abc")]));
        let json = serde_json::to_string(&cp).unwrap();
        let back: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cp);
    }

    #[test]
    fn same_tree_ignores_metadata() {
        let cp = Checkpoint::new(None, "first", files(&[("a.css", "1")]));
        assert!(cp.same_tree(&files(&[("a.css", "1")])));
        assert!(!cp.same_tree(&files(&[("a.css", "2")])));
    }
}
