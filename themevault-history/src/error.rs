//! Error types for themevault-history.

use std::path::PathBuf;

use thiserror::Error;

use themevault_core::CoreError;

/// All errors that can arise from version history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A label name or checkpoint id that resolves to nothing.
    #[error("unknown reference '{reference}'")]
    UnknownReference { reference: String },

    /// A checkpoint id prefix that matches more than one checkpoint.
    #[error("ambiguous reference '{reference}' matches {count} checkpoints")]
    AmbiguousReference { reference: String, count: usize },

    /// Labels are append-only; an existing name is never reused.
    #[error("label '{name}' already exists")]
    LabelExists { name: String },

    /// The push counter has no number left above the highest `v<N>-push`.
    #[error("push versions exhausted after v{highest}-push")]
    VersionsExhausted { highest: u64 },

    /// The workspace has no history directory.
    #[error("no version history at {path}; run `themevault init` first")]
    NotInitialized { path: PathBuf },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A history record that does not parse.
    #[error("corrupt history record at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A stored object whose content no longer matches its hash.
    #[error("corrupt object {hash}")]
    CorruptObject { hash: String },

    /// A working-tree path that cannot be an item key.
    #[error(transparent)]
    Key(#[from] CoreError),
}

/// Convenience constructor for [`HistoryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HistoryError {
    HistoryError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> HistoryError {
    HistoryError::Json {
        path: path.into(),
        source,
    }
}
