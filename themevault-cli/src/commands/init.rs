//! `themevault init --store <host> --protected <id> --mutable <id> --credential <token>`

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use chrono::Utc;
use clap::Args;

use themevault_core::config::{self, DEFAULT_API_VERSION};
use themevault_core::{Config, Pacing, TargetId, TargetRef, TargetRole};
use themevault_history::{label::INIT_LABEL, VersionStore};
use themevault_remote::HttpRemoteStore;
use themevault_sync::{bootstrap, guard, Context, SyncError, Verdict};

use super::print_failures;

/// Configure the workspace and import the mutable target.
///
/// Re-running refreshes the recorded target names and credential; the
/// initial import happens only once.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Store host (e.g. `example.myshopify.com`) or a full base URL.
    #[arg(long)]
    pub store: String,

    /// Identifier of the live (protected) target.
    #[arg(long, value_name = "ID")]
    pub protected: String,

    /// Identifier of the development (mutable) target.
    #[arg(long, value_name = "ID")]
    pub mutable: String,

    /// Access token for the store.
    #[arg(long)]
    pub credential: String,

    /// Admin API version.
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    pub api_version: String,
}

impl InitArgs {
    pub fn run(self, workspace: &Path) -> Result<()> {
        if self.protected == self.mutable {
            bail!("the protected and mutable targets must differ");
        }
        std::fs::create_dir_all(workspace)
            .with_context(|| format!("cannot create workspace '{}'", workspace.display()))?;

        // Keep hand-tuned pacing across re-runs.
        let pacing = config::load_at(workspace)
            .map(|c| c.pacing)
            .unwrap_or_else(|_| Pacing::default());
        let mut cfg = Config {
            store: self.store,
            api_version: self.api_version,
            protected: TargetRef {
                id: TargetId::from(self.protected),
                name: String::new(),
            },
            mutable: TargetRef {
                id: TargetId::from(self.mutable),
                name: String::new(),
            },
            credential: self.credential,
            created_at: Utc::now(),
            pacing,
        };
        let remote = HttpRemoteStore::new(&cfg);

        let protected_id = cfg.protected.id.clone();
        let protected = match guard::check(&remote, &protected_id, true) {
            Verdict::Safe { info, .. } | Verdict::Blocked { info } => info,
            Verdict::Unresolved { reason } => {
                return Err(SyncError::Unresolved {
                    id: protected_id,
                    reason,
                }
                .into())
            }
        };
        if protected.role != TargetRole::Protected {
            return Err(SyncError::NotProtected {
                target: TargetRef {
                    id: protected.id,
                    name: protected.name,
                },
                role: protected.role,
            }
            .into());
        }
        let mutable_id = cfg.mutable.id.clone();
        let mutable = guard::check(&remote, &mutable_id, false).require_safe(&mutable_id)?;
        cfg.protected.name = protected.name;
        cfg.mutable.name = mutable.name;

        let path = config::save_at(workspace, &cfg).context("failed to save configuration")?;
        println!("✓ Saved configuration to {}", path.display());
        println!("  protected: {}", cfg.protected);
        println!("  mutable:   {}", cfg.mutable);

        let history = VersionStore::init(workspace).map_err(SyncError::from)?;
        if history.find_label(INIT_LABEL).map_err(SyncError::from)?.is_some() {
            println!("· Initial import already present ({INIT_LABEL}); history kept");
            return Ok(());
        }

        let report = bootstrap(&Context::new(&cfg, &remote, &history))
            .context("initial import failed")?;
        println!(
            "✓ Imported {} item(s) from {} as {}",
            report.imported.len(),
            cfg.mutable,
            report.label.name
        );
        print_failures("skipped", &report.skipped);
        Ok(())
    }
}
