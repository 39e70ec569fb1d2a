//! `themevault history [-n N | --all] [--verbose] [--json]`

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use themevault_history::{Label, VersionStore};
use themevault_sync::report::{list_history, HistoryEntry};
use themevault_sync::SyncError;

const DEFAULT_LIMIT: usize = 10;

/// List labels, newest first.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show at most N labels.
    #[arg(short = 'n', value_name = "N", default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Show every label.
    #[arg(long, conflicts_with = "limit")]
    pub all: bool,

    /// Include checkpoint message and file count.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Emit machine-readable JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl HistoryArgs {
    pub fn run(self, workspace: &Path) -> Result<()> {
        let history = VersionStore::open(workspace).map_err(SyncError::from)?;
        let limit = (!self.all).then_some(self.limit);
        let entries = list_history(&history, limit, self.verbose)?;

        if self.json {
            return print_json(entries);
        }
        if entries.is_empty() {
            println!("No labels yet. Run 'themevault init' to import the mutable target.");
            return Ok(());
        }
        println!("{}", label_table(entries));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "label")]
    name: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "created")]
    created: String,
    #[tabled(rename = "checkpoint")]
    checkpoint: String,
    #[tabled(rename = "message")]
    message: String,
}

#[derive(Tabled)]
struct VerboseLabelRow {
    #[tabled(inline)]
    row: LabelRow,
    #[tabled(rename = "snapshot")]
    snapshot: String,
    #[tabled(rename = "files")]
    files: usize,
}

fn label_row(label: Label) -> LabelRow {
    LabelRow {
        created: format_time(&label.created_at),
        checkpoint: label.checkpoint.short().to_string(),
        kind: label.kind.to_string(),
        name: label.name,
        message: label.message,
    }
}

/// Rounded table of labels; verbose columns appear when any entry has them.
pub fn label_table(entries: Vec<HistoryEntry>) -> String {
    let verbose = entries.iter().any(|e| e.detail.is_some());
    let mut table = if verbose {
        Table::new(entries.into_iter().map(|e| {
            let (snapshot, files) = e.detail.unwrap_or_default();
            VerboseLabelRow {
                row: label_row(e.label),
                snapshot,
                files,
            }
        }))
    } else {
        Table::new(entries.into_iter().map(|e| label_row(e.label)))
    };
    table.with(Style::rounded());
    table.to_string()
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Serialize)]
struct HistoryEntryJson {
    #[serde(flatten)]
    label: Label,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<usize>,
}

fn print_json(entries: Vec<HistoryEntry>) -> Result<()> {
    let payload: Vec<HistoryEntryJson> = entries
        .into_iter()
        .map(|e| {
            let (snapshot, files) = e.detail.unzip();
            HistoryEntryJson {
                label: e.label,
                snapshot,
                files,
            }
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize history JSON")?
    );
    Ok(())
}
