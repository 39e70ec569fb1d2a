//! Promotion: copy a tree onto the protected target.
//!
//! This is the only operation that writes to the protected target. Before
//! the first write the protected target's full item set is committed and
//! labelled `pre-promote-<timestamp>`, and the report carries the command
//! that restores it.

use std::collections::BTreeMap;

use chrono::Utc;

use themevault_core::{Item, ItemKey, TargetRole};
use themevault_history::{CheckpointId, Label, LabelKind};
use themevault_remote::RemoteError;

use crate::batch::{upload_all, ItemFailure};
use crate::guard::{self, Verdict};
use crate::{Context, SyncError, WorkspaceLock};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Operator confirmation before writing to the protected target.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromoteOptions {
    /// Promote this label's tree instead of the working tree.
    pub from: Option<String>,
    /// Skip the confirmation prompt.
    pub yes: bool,
}

#[derive(Debug, Clone)]
pub struct PromoteReport {
    pub source: CheckpointId,
    pub uploaded: Vec<ItemKey>,
    pub failed: Vec<ItemFailure>,
    /// Credential failure that stopped the uploads early.
    pub aborted: Option<RemoteError>,
    pub backup: Label,
    pub label: Label,
    /// Command that puts the protected target back as it was.
    pub restore_command: String,
}

pub fn restore_command(backup_label: &str) -> String {
    format!("themevault promote --from {backup_label} --yes")
}

pub fn promote(
    ctx: &Context<'_>,
    options: &PromoteOptions,
    confirm: &dyn Confirm,
) -> Result<PromoteReport, SyncError> {
    let history = ctx.history;
    let _lock = WorkspaceLock::acquire(history.workspace())?;
    let protected = &ctx.config.protected;

    // Step 1: the configured id must still be the protected target.
    let info = match guard::check(ctx.remote, &protected.id, true) {
        Verdict::Safe { info, .. } | Verdict::Blocked { info } => info,
        Verdict::Unresolved { reason } => {
            return Err(SyncError::Unresolved {
                id: protected.id.clone(),
                reason,
            })
        }
    };
    if info.role != TargetRole::Protected {
        return Err(SyncError::NotProtected {
            target: protected.clone(),
            role: info.role,
        });
    }

    // Step 2: the mutable side must be what we think it is too.
    let mutable = &ctx.config.mutable.id;
    guard::check(ctx.remote, mutable, false).require_safe(mutable)?;

    let source_count = match &options.from {
        Some(reference) => history.read_tree(reference)?.len(),
        None => history.working_files()?.len(),
    };
    let source_name = options.from.as_deref().unwrap_or("the working tree");

    // Step 3.
    if !options.yes {
        let prompt = format!(
            "Promote {source_count} file(s) from {source_name} to the live target {protected}?"
        );
        if !confirm.confirm(&prompt) {
            return Err(SyncError::Declined);
        }
    }

    // Step 4: back up the protected target.
    let mut live = BTreeMap::new();
    for summary in ctx.remote.list_items(&protected.id)? {
        if let Some(item) = ctx.remote.get_item(&protected.id, &summary.key)? {
            live.insert(item.key.clone(), item.content.into_bytes());
        }
    }
    let stamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
    let backup_cp = history.commit_detached(&format!("pre-promote: {protected}"), &live)?;
    let backup_name = history.available_name(&format!("pre-promote-{stamp}"))?;
    let backup = history.label(
        &backup_cp.id,
        &backup_name,
        LabelKind::PrePromote,
        &format!("{protected} before promotion"),
    )?;
    tracing::info!("backed up {} item(s) of {protected} as {backup_name}", live.len());

    // Step 5: upload the source tree.
    let source = match &options.from {
        Some(reference) => history.resolve(reference)?,
        None => history.snapshot("promote: working tree")?.id,
    };
    let tree = history.read_tree(&source.0)?;
    let items = tree
        .into_iter()
        .map(|(key, bytes)| Item::from_bytes(key, bytes));
    let outcome = upload_all(ctx.remote, &protected.id, items);
    if outcome.succeeded.is_empty() && !outcome.failed.is_empty() {
        if let Some(e) = &outcome.aborted {
            return Err(e.clone().into());
        }
        return Err(SyncError::TotalFailure {
            failed: outcome.failed.len(),
            pre_checkpoint: backup_cp.id,
        });
    }

    // Step 6.
    let name = history.available_name(&format!("promote-{stamp}"))?;
    let label = history.label(
        &source,
        &name,
        LabelKind::Promote,
        &format!("promoted {source_name} to {protected}"),
    )?;
    if let Some(e) = &outcome.aborted {
        tracing::warn!("promotion aborted after {} upload(s) ({e}); recorded as {name}", outcome.succeeded.len());
    }

    Ok(PromoteReport {
        source,
        uploaded: outcome.succeeded,
        failed: outcome.failed,
        aborted: outcome.aborted,
        restore_command: restore_command(&backup.name),
        backup,
        label,
    })
}
