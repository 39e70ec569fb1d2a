//! `themevault diff [<a> [<b>]] [--stat] [--staged]`
//!
//! - no arguments or `--staged`: last checkpoint vs working tree
//! - one label: that label vs the last checkpoint (`HEAD`)
//! - two labels: `a` vs `b`

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use themevault_history::{ChangeStatus, VersionStore};
use themevault_sync::report::{diff_labels, diff_uncommitted, DiffReport, FileDiff};
use themevault_sync::SyncError;

/// Show changes between labels or against the working tree.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Older side: a label, checkpoint id prefix or `HEAD`.
    pub from: Option<String>,

    /// Newer side (defaults to `HEAD`).
    #[arg(requires = "from")]
    pub to: Option<String>,

    /// Only print per-file line counts.
    #[arg(long)]
    pub stat: bool,

    /// Compare the working tree against the last checkpoint.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub staged: bool,
}

impl DiffArgs {
    pub fn run(self, workspace: &Path) -> Result<()> {
        let history = VersionStore::open(workspace).map_err(SyncError::from)?;
        let report = match (self.from.as_deref(), self.to.as_deref()) {
            (Some(a), Some(b)) => diff_labels(&history, a, b, self.stat)?,
            (Some(a), None) => diff_labels(&history, a, "HEAD", self.stat)?,
            _ => diff_uncommitted(&history, self.stat)?,
        };
        print_report(&report, self.stat);
        Ok(())
    }
}

fn print_report(report: &DiffReport, stat: bool) {
    if report.is_empty() {
        println!("No changes between {} and {}.", report.from, report.to);
        return;
    }
    if !stat {
        for file in &report.files {
            print!("{}", file.unified_diff.as_deref().unwrap_or_default());
        }
        return;
    }

    let width = report
        .files
        .iter()
        .map(|f| f.key.as_str().len())
        .max()
        .unwrap_or(0);
    for file in &report.files {
        println!(
            " {} {:<width$} | {}",
            status_marker(file.status),
            file.key.as_str(),
            stat_detail(file)
        );
    }
    let totals = report.totals();
    println!(
        " {} file(s) changed, {} insertion(s)(+), {} deletion(s)(-)",
        report.files.len(),
        totals.insertions,
        totals.deletions
    );
}

fn status_marker(status: ChangeStatus) -> String {
    match status {
        ChangeStatus::Added => "A".green().to_string(),
        ChangeStatus::Modified => "M".yellow().to_string(),
        ChangeStatus::Deleted => "D".red().to_string(),
    }
}

fn stat_detail(file: &FileDiff) -> String {
    match file.stats {
        Some(s) => format!(
            "{} {}",
            format!("+{}", s.insertions).green(),
            format!("-{}", s.deletions).red()
        ),
        None => "binary".bright_black().to_string(),
    }
}
