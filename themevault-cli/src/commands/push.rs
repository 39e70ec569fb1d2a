//! `themevault push <keys>... [-m <message>]`

use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;
use colored::Colorize;

use themevault_core::ItemKey;
use themevault_sync::{push, SyncError};

use super::{print_failures, Workspace};

/// Upload working-tree items to the mutable target and label the result.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Item keys relative to the workspace (e.g. `assets/base.css`).
    #[arg(required = true, value_name = "KEY")]
    pub keys: Vec<String>,

    /// Message recorded on the checkpoint and label.
    #[arg(long, short = 'm')]
    pub message: Option<String>,
}

impl PushArgs {
    pub fn run(self, workspace: &Path) -> Result<()> {
        let keys = parse_keys(&self.keys)?;
        let ws = Workspace::open(workspace)?;
        let report = push(&ws.context(), &keys, self.message.as_deref())
            .with_context(|| format!("push to {} failed", ws.config.mutable))?;

        println!(
            "{} Pushed {} item(s) to {} as {}",
            "✓".green(),
            report.uploaded.len(),
            ws.config.mutable,
            report.label.name.bold()
        );
        for key in &report.uploaded {
            println!("  ✎ {key}");
        }
        print_failures("failed", &report.failed);
        if let Some(e) = report.aborted {
            return Err(anyhow::Error::new(SyncError::Remote(e)).context(format!(
                "push stopped early; what was uploaded is recorded as {}",
                report.label.name
            )));
        }
        if !report.failed.is_empty() {
            bail!(
                "{} of {} item(s) failed; rerun push for the failed keys",
                report.failed.len(),
                report.failed.len() + report.uploaded.len()
            );
        }
        Ok(())
    }
}

/// Accept keys as typed, tolerating a leading `./`.
fn parse_keys(raw: &[String]) -> Result<Vec<ItemKey>> {
    raw.iter()
        .map(|s| {
            let trimmed = s.strip_prefix("./").unwrap_or(s);
            ItemKey::new(trimmed).map_err(|e| anyhow!("invalid key '{s}': {e}"))
        })
        .collect()
}
