//! Read-only diff and history queries. No guard, no remote calls.

use themevault_core::ItemKey;
use themevault_history::{ChangeStatus, FileChange, Label, LabelFilter, LineStats, VersionStore};

use crate::SyncError;

/// One changed file of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub key: ItemKey,
    pub status: ChangeStatus,
    /// `None` for binary content.
    pub stats: Option<LineStats>,
    /// Unified diff; omitted in stat-only mode.
    pub unified_diff: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub from: String,
    pub to: String,
    pub files: Vec<FileDiff>,
}

impl DiffReport {
    fn build(from: &str, to: &str, changes: Vec<FileChange>, stat_only: bool) -> Self {
        let files = changes
            .into_iter()
            .map(|c| FileDiff {
                key: c.key.clone(),
                status: c.status,
                stats: c.line_stats(),
                unified_diff: (!stat_only).then(|| c.unified()),
            })
            .collect();
        Self {
            from: from.to_string(),
            to: to.to_string(),
            files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Summed line counts over text files.
    pub fn totals(&self) -> LineStats {
        self.files
            .iter()
            .filter_map(|f| f.stats)
            .fold(LineStats::default(), |acc, s| LineStats {
                insertions: acc.insertions + s.insertions,
                deletions: acc.deletions + s.deletions,
            })
    }
}

/// Changes between two labels (or checkpoint references).
pub fn diff_labels(
    history: &VersionStore,
    a: &str,
    b: &str,
    stat_only: bool,
) -> Result<DiffReport, SyncError> {
    let changes = history.diff(a, b)?;
    Ok(DiffReport::build(a, b, changes, stat_only))
}

/// Changes in the working tree since the last checkpoint.
pub fn diff_uncommitted(history: &VersionStore, stat_only: bool) -> Result<DiffReport, SyncError> {
    let changes = history.diff_uncommitted()?;
    Ok(DiffReport::build("HEAD", "working tree", changes, stat_only))
}

/// One row of `themevault history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub label: Label,
    /// Checkpoint message and file count, in verbose mode.
    pub detail: Option<(String, usize)>,
}

/// Labels newest first; `limit: None` lists all of them.
pub fn list_history(
    history: &VersionStore,
    limit: Option<usize>,
    verbose: bool,
) -> Result<Vec<HistoryEntry>, SyncError> {
    let labels = history.list_labels(&LabelFilter::default(), limit)?;
    labels
        .into_iter()
        .map(|label| -> Result<HistoryEntry, SyncError> {
            let detail = if verbose {
                let cp = history.checkpoint(&label.checkpoint)?;
                Some((cp.message, cp.files.len()))
            } else {
                None
            };
            Ok(HistoryEntry { label, detail })
        })
        .collect()
}
