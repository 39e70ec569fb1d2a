//! Error taxonomy for remote store calls.

use std::time::Duration;

use thiserror::Error;

/// Every way a remote call can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Missing or rejected credential.
    #[error("authentication failed: the credential is missing or invalid")]
    Auth,

    /// The credential lacks a capability the operation needs.
    #[error("forbidden: the credential lacks the `{capability}` capability")]
    Forbidden { capability: String },

    /// The target or item does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The remote rejected the write payload.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The rate-limit budget was exceeded; retry after the advised wait.
    #[error("rate limited: retry after {}s", retry_after.as_secs_f64())]
    RateLimited { retry_after: Duration },

    /// The response body did not have the expected shape.
    #[error("malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// Any other HTTP failure status.
    #[error("remote returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    /// Connection failure or timeout; transient for the affected item.
    #[error("transport error: {detail}")]
    Transport { detail: String },
}

impl RemoteError {
    /// Errors that would fail every remaining item of a batch.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, RemoteError::Auth | RemoteError::Forbidden { .. })
    }

    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport { .. } | RemoteError::RateLimited { .. } => true,
            RemoteError::Status { code, .. } => *code >= 500,
            _ => false,
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        RemoteError::MalformedResponse {
            detail: detail.into(),
        }
    }
}
