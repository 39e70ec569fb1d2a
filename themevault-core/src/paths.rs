//! Workspace layout.
//!
//! ```text
//! <workspace>/
//!   <item files…>            working tree, keyed by relative path
//!   .themevault/
//!     config.yaml            config record (mode 0600, never snapshotted)
//!     lock                   advisory single-writer lock
//!     history/               version history store
//! ```

use std::path::{Path, PathBuf};

pub const RESERVED_DIR: &str = ".themevault";
pub const CONFIG_FILE: &str = "config.yaml";
pub const LOCK_FILE: &str = "lock";
pub const HISTORY_DIR: &str = "history";

pub fn reserved_dir(workspace: &Path) -> PathBuf {
    workspace.join(RESERVED_DIR)
}

pub fn config_path(workspace: &Path) -> PathBuf {
    reserved_dir(workspace).join(CONFIG_FILE)
}

pub fn lock_path(workspace: &Path) -> PathBuf {
    reserved_dir(workspace).join(LOCK_FILE)
}

pub fn history_dir(workspace: &Path) -> PathBuf {
    reserved_dir(workspace).join(HISTORY_DIR)
}
