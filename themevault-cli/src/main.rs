//! themevault: versioned, safety-gated theme sync CLI.
//!
//! # Usage
//!
//! ```text
//! themevault init --store <host> --protected <id> --mutable <id> --credential <token>
//! themevault push <keys>... [-m <message>]
//! themevault rollback --list | --to <label>
//! themevault promote [--yes] [--from <label>]
//! themevault diff [<a> [<b>]] [--stat] [--staged]
//! themevault history [-n N | --all] [--verbose] [--json]
//! ```
//!
//! Every command takes `--workspace <dir>` (default: current directory).
//! Exit codes: 0 success, 1 refused or failed run, 2 resolution or
//! configuration error.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{
    diff::DiffArgs, history::HistoryArgs, init::InitArgs, promote::PromoteArgs, push::PushArgs,
    rollback::RollbackArgs,
};
use themevault_sync::SyncError;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "themevault",
    version,
    about = "Push, version, roll back and promote storefront themes safely",
    long_about = None,
)]
struct Cli {
    /// Workspace directory holding the working tree and `.themevault/`.
    #[arg(long, short = 'w', global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configure the workspace and import the mutable target.
    Init(InitArgs),

    /// Upload working-tree items to the mutable target.
    Push(PushArgs),

    /// Restore the mutable target to a labelled state.
    Rollback(RollbackArgs),

    /// Copy a tree onto the protected (live) target.
    Promote(PromoteArgs),

    /// Show changes between labels or against the working tree.
    Diff(DiffArgs),

    /// List labels, newest first.
    History(HistoryArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let workspace = cli.workspace;
    match cli.command {
        Commands::Init(args) => args.run(&workspace),
        Commands::Push(args) => args.run(&workspace),
        Commands::Rollback(args) => args.run(&workspace),
        Commands::Promote(args) => args.run(&workspace),
        Commands::Diff(args) => args.run(&workspace),
        Commands::History(args) => args.run(&workspace),
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SyncError>())
        .map_or(1, SyncError::exit_code)
}

/// Logs go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
