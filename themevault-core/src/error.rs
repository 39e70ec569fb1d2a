//! Error types for themevault-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from the data model and config persistence.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The workspace has no config record; setup has not run yet.
    #[error("config not found at {path}; run `themevault init` first")]
    ConfigNotFound { path: PathBuf },

    /// An item key that cannot name a file in the working tree.
    #[error("invalid item key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
