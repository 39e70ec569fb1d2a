//! Error types for themevault-sync.

use std::path::PathBuf;

use thiserror::Error;

use themevault_core::{CoreError, ItemKey, TargetId, TargetRef, TargetRole};
use themevault_history::{CheckpointId, HistoryError};
use themevault_remote::RemoteError;

/// All errors that can arise from orchestrator runs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The guard classified the target as protected.
    #[error("target {name} ({id}) is protected; refusing to write")]
    Blocked { id: TargetId, name: String },

    /// The guard could not establish the target's role.
    #[error("could not verify target {id}: {reason}")]
    Unresolved { id: TargetId, reason: String },

    /// The configured protected target has changed role.
    #[error(
        "configured protected target {target} now has role {role}; \
         refresh the configuration with `themevault init`"
    )]
    NotProtected { target: TargetRef, role: TargetRole },

    /// The operator declined the confirmation prompt.
    #[error("promotion declined; nothing was written")]
    Declined,

    #[error("no item keys given")]
    EmptyBatch,

    /// Requested keys that do not exist in the working tree.
    #[error("not in the working tree: {}", join_keys(.keys))]
    MissingLocal { keys: Vec<ItemKey> },

    /// Every upload of a batch failed.
    #[error("all {failed} uploads failed; pre-write checkpoint {} kept", .pre_checkpoint.short())]
    TotalFailure {
        failed: usize,
        pre_checkpoint: CheckpointId,
    },

    /// Another run holds the workspace lock.
    #[error("workspace is locked by another run ({path}); remove it if stale")]
    Locked { path: PathBuf },

    /// The workspace already holds an initial import.
    #[error("workspace already initialized (label '{label}' exists)")]
    AlreadyInitialized { label: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Process exit code: 1 for refused or failed runs, 2 for resolution
    /// and configuration errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Unresolved { .. }
            | SyncError::NotProtected { .. }
            | SyncError::Core(_)
            | SyncError::Remote(RemoteError::Auth | RemoteError::Forbidden { .. }) => 2,
            SyncError::History(
                HistoryError::UnknownReference { .. }
                | HistoryError::AmbiguousReference { .. }
                | HistoryError::NotInitialized { .. }
                | HistoryError::Key(_),
            ) => 2,
            _ => 1,
        }
    }
}

fn join_keys(keys: &[ItemKey]) -> String {
    keys.iter()
        .map(ItemKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SyncError::Blocked { id: "1".into(), name: "Live".into() }, 1)]
    #[case(SyncError::Declined, 1)]
    #[case(SyncError::EmptyBatch, 1)]
    #[case(SyncError::TotalFailure { failed: 2, pre_checkpoint: CheckpointId("a".repeat(64)) }, 1)]
    #[case(SyncError::Unresolved { id: "2".into(), reason: "gone".into() }, 2)]
    #[case(SyncError::History(HistoryError::UnknownReference { reference: "v9-push".into() }), 2)]
    #[case(SyncError::Remote(RemoteError::Auth), 2)]
    #[case(SyncError::Remote(RemoteError::Transport { detail: "timeout".into() }), 1)]
    fn exit_codes(#[case] err: SyncError, #[case] code: u8) {
        assert_eq!(err.exit_code(), code);
    }

    #[test]
    fn missing_local_lists_keys() {
        let err = SyncError::MissingLocal {
            keys: vec![
                ItemKey::new("a.css").unwrap(),
                ItemKey::new("b/c.liquid").unwrap(),
            ],
        };
        assert_eq!(err.to_string(), "not in the working tree: a.css, b/c.liquid");
    }
}
