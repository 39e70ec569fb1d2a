//! Subcommand implementations. Each exposes a clap `Args` struct with a
//! `run(self, workspace)` method.

pub mod diff;
pub mod history;
pub mod init;
pub mod promote;
pub mod push;
pub mod rollback;

use std::path::Path;

use colored::Colorize;

use themevault_core::{config, Config};
use themevault_history::VersionStore;
use themevault_remote::HttpRemoteStore;
use themevault_sync::{Context, ItemFailure, SyncError};

/// Everything a mutating command needs: config, history and remote client.
pub struct Workspace {
    pub config: Config,
    pub history: VersionStore,
    pub remote: HttpRemoteStore,
}

impl Workspace {
    pub fn open(root: &Path) -> Result<Self, SyncError> {
        let config = config::load_at(root)?;
        let history = VersionStore::open(root)?;
        let remote = HttpRemoteStore::new(&config);
        tracing::debug!(
            "workspace {}: store {}, mutable {}",
            root.display(),
            config.endpoint(),
            config.mutable
        );
        Ok(Self {
            config,
            history,
            remote,
        })
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(&self.config, &self.remote, &self.history)
    }
}

/// Print per-item failures under a report.
pub fn print_failures(heading: &str, failures: &[ItemFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("{} {heading}:", "✗".red());
    for f in failures {
        println!("  {}  {}", f.key, f.error.to_string().red());
    }
}
