//! `themevault promote [--yes] [--from <label>]`

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use colored::Colorize;

use themevault_sync::{promote, PromoteOptions, SyncError};

use super::{print_failures, Workspace};

/// Copy a tree onto the protected (live) target after backing it up.
#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Promote a labelled state instead of the working tree.
    #[arg(long, value_name = "LABEL")]
    pub from: Option<String>,
}

impl PromoteArgs {
    pub fn run(self, workspace: &Path) -> Result<()> {
        let ws = Workspace::open(workspace)?;
        let options = PromoteOptions {
            from: self.from,
            yes: self.yes,
        };
        let report = promote(&ws.context(), &options, &ask)
            .with_context(|| format!("promotion to {} failed", ws.config.protected))?;

        println!(
            "{} Backed up {} as {}",
            "✓".green(),
            ws.config.protected,
            report.backup.name.bold()
        );
        println!(
            "{} Promoted {} item(s) to {} as {}",
            "✓".green(),
            report.uploaded.len(),
            ws.config.protected,
            report.label.name.bold()
        );
        print_failures("failed", &report.failed);
        println!("  To restore the previous live state: {}", report.restore_command);
        if let Some(e) = report.aborted {
            return Err(anyhow::Error::new(SyncError::Remote(e)).context(format!(
                "promotion stopped early; what was uploaded is recorded as {}",
                report.label.name
            )));
        }
        if !report.failed.is_empty() {
            bail!("{} item(s) failed to promote", report.failed.len());
        }
        Ok(())
    }
}

/// Prompt on stdout, read a yes/no answer from stdin. Anything but `y`/`yes`
/// declines, including end of input.
fn ask(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::is_yes;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n\n"));
        assert!(!is_yes("yep"));
    }
}
