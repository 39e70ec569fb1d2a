//! `themevault rollback --list | --to <label>`

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use colored::Colorize;

use themevault_history::VersionStore;
use themevault_sync::report::HistoryEntry;
use themevault_sync::rollback::{candidates, rollback};
use themevault_sync::{Settle, SyncError};

use super::history::label_table;
use super::{print_failures, Workspace};

/// Restore the mutable target to a labelled state.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("mode").required(true).args(["list", "to"]))]
pub struct RollbackArgs {
    /// List labels that can be rolled back to.
    #[arg(long)]
    pub list: bool,

    /// Label (or checkpoint id prefix) to restore.
    #[arg(long, value_name = "LABEL")]
    pub to: Option<String>,

    /// How many candidates `--list` shows.
    #[arg(short = 'n', value_name = "N", default_value_t = 20)]
    pub limit: usize,
}

impl RollbackArgs {
    pub fn run(self, workspace: &Path) -> Result<()> {
        match self.to {
            Some(reference) => restore(workspace, &reference),
            None => list(workspace, self.limit),
        }
    }
}

fn list(workspace: &Path, limit: usize) -> Result<()> {
    let history = VersionStore::open(workspace).map_err(SyncError::from)?;
    let labels = candidates(&history, Some(limit))?;
    if labels.is_empty() {
        println!("No rollback candidates.");
        return Ok(());
    }
    let entries = labels
        .into_iter()
        .map(|label| HistoryEntry {
            label,
            detail: None,
        })
        .collect();
    println!("{}", label_table(entries));
    Ok(())
}

fn restore(workspace: &Path, reference: &str) -> Result<()> {
    let ws = Workspace::open(workspace)?;
    let report = rollback(&ws.context(), reference)
        .with_context(|| format!("rollback of {} to '{reference}' failed", ws.config.mutable))?;

    if let Settle::Degraded { attempts, reason } = &report.settle {
        println!(
            "{} Target still processing after {attempts} poll(s) ({reason}); continued anyway",
            "!".yellow()
        );
    }
    println!(
        "{} Restored {} to {} ({} uploaded, {} deleted) as {}",
        "✓".green(),
        ws.config.mutable,
        report.target_label.bold(),
        report.uploaded.len(),
        report.deleted.len(),
        report.label.name.bold()
    );
    print_failures("upload failed", &report.upload_failures);
    print_failures("delete failed", &report.delete_failures);
    if let Some(err) = &report.reconcile_error {
        println!(
            "{} Could not list the target; stale items were not removed: {}",
            "✗".red(),
            err
        );
    }
    if let Some(e) = report.aborted.clone() {
        return Err(anyhow::Error::new(SyncError::Remote(e)).context(format!(
            "rollback stopped early; the partial restore is recorded as {}",
            report.label.name
        )));
    }
    if !report.is_clean() {
        bail!("rollback finished with errors; the target may differ from '{reference}'");
    }
    Ok(())
}
