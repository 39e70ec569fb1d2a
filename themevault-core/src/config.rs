//! Workspace config record.
//!
//! # Storage layout
//!
//! ```text
//! <workspace>/.themevault/
//!   config.yaml   (mode 0600; directory mode 0700)
//! ```
//!
//! The record is written once by setup and read by every orchestrator. The
//! core never mutates it; components receive an immutable [`Config`] in
//! their constructors.
//!
//! # API pattern
//!
//! Functions take an explicit workspace root (`load_at`, `save_at`) so tests
//! can run against a `TempDir`.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::paths;
use crate::types::TargetRef;

pub const DEFAULT_API_VERSION: &str = "2024-01";

/// Request pacing and timeout settings for the remote client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Minimum spacing between two remote calls, in milliseconds.
    pub min_interval_ms: u64,
    /// Per-call timeout, in seconds.
    pub timeout_secs: u64,
    /// Polls of a target's `processing` flag before continuing degraded.
    pub settle_attempts: u32,
    /// Delay between two processing polls, in milliseconds.
    pub settle_delay_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        // Leaky bucket drains 2 requests per second.
        Self {
            min_interval_ms: 500,
            timeout_secs: 30,
            settle_attempts: 10,
            settle_delay_ms: 1000,
        }
    }
}

/// Durable record of the store endpoint, the two targets and the credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Store host (`example.myshopify.com`) or a full `http(s)://` base URL.
    pub store: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub protected: TargetRef,
    pub mutable: TargetRef,
    pub credential: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub pacing: Pacing,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Config {
    /// Base URL every remote path is joined onto.
    pub fn endpoint(&self) -> String {
        let store = self.store.trim_end_matches('/');
        if store.starts_with("http://") || store.starts_with("https://") {
            store.to_string()
        } else {
            format!("https://{store}/admin/api/{}", self.api_version)
        }
    }
}

// The credential never reaches logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("protected", &self.protected)
            .field("mutable", &self.mutable)
            .field("credential", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("pacing", &self.pacing)
            .finish()
    }
}

/// Load the config record of `workspace`.
///
/// Returns `CoreError::ConfigNotFound` if absent,
/// `CoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(workspace: &Path) -> Result<Config, CoreError> {
    let path = paths::config_path(workspace);
    if !path.exists() {
        return Err(CoreError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

/// Atomically save the config record of `workspace`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(workspace: &Path, config: &Config) -> Result<PathBuf, CoreError> {
    let dir = paths::reserved_dir(workspace);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = paths::config_path(workspace);
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
