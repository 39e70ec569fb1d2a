//! # themevault-sync
//!
//! Safety gating and orchestration over the remote store and the version
//! history.
//!
//! - [`guard`]: classifies a target as safe, blocked or unresolved
//! - [`push`]: upload working-tree items to the mutable target
//! - [`rollback`]: restore the mutable target to a labelled state
//! - [`promote`]: copy a tree onto the protected target
//! - [`bootstrap`]: import the mutable target into a fresh workspace
//! - [`report`]: read-only diff and history queries
//!
//! Every mutating run holds a [`WorkspaceLock`] and leaves at least one
//! label behind when it wrote to the remote.

use themevault_core::Config;
use themevault_history::VersionStore;
use themevault_remote::RemoteStore;

pub mod batch;
pub mod bootstrap;
pub mod error;
pub mod guard;
pub mod lock;
pub mod promote;
pub mod push;
pub mod report;
pub mod rollback;
pub mod settle;

pub use batch::ItemFailure;
pub use bootstrap::{bootstrap, BootstrapReport};
pub use error::SyncError;
pub use guard::Verdict;
pub use lock::WorkspaceLock;
pub use promote::{promote, Confirm, PromoteOptions, PromoteReport};
pub use push::{push, PushReport};
pub use rollback::{rollback, RollbackReport};
pub use settle::{Settle, SettlePolicy};

/// Everything an orchestrator run needs.
pub struct Context<'a> {
    pub config: &'a Config,
    pub remote: &'a dyn RemoteStore,
    pub history: &'a VersionStore,
    pub settle: SettlePolicy,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a Config, remote: &'a dyn RemoteStore, history: &'a VersionStore) -> Self {
        Self {
            config,
            remote,
            history,
            settle: SettlePolicy::from(&config.pacing),
        }
    }
}
