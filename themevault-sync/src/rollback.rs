//! Rollback: restore the mutable target to a labelled state.
//!
//! ## Protocol
//!
//! 1. Resolve the reference.
//! 2. Guard check on the mutable target.
//! 3. Snapshot the working tree (`pre-rollback`).
//! 4. Materialize the labelled tree into the working tree.
//! 5. Wait for the target to settle, then upload every restored file.
//! 6. Reconcile: delete remote items outside the restored set and drop the
//!    matching local files. Uploads always finish before any delete.
//! 7. Snapshot and label `<label>-rollback-<unixTime>`.
//!
//! Once any upload has landed the run always reaches step 7. A credential
//! failure after that point skips the rest and is carried in
//! [`RollbackReport::aborted`].

use std::collections::BTreeSet;

use chrono::Utc;

use themevault_core::{Item, ItemKey};
use themevault_history::{CheckpointId, Label, LabelFilter, LabelKind, VersionStore};
use themevault_remote::RemoteError;

use crate::batch::{delete_all, upload_all, BatchOutcome, ItemFailure};
use crate::settle::{wait_until_ready, Settle};
use crate::{guard, Context, SyncError, WorkspaceLock};

#[derive(Debug, Clone)]
pub struct RollbackReport {
    pub target_label: String,
    pub checkpoint: CheckpointId,
    pub settle: Settle,
    pub uploaded: Vec<ItemKey>,
    pub upload_failures: Vec<ItemFailure>,
    pub deleted: Vec<ItemKey>,
    pub delete_failures: Vec<ItemFailure>,
    /// Set when the remote listing failed and no deletes were attempted.
    pub reconcile_error: Option<RemoteError>,
    /// Credential failure that stopped the uploads or deletes early; the
    /// label still records what was written.
    pub aborted: Option<RemoteError>,
    pub label: Label,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.upload_failures.is_empty()
            && self.delete_failures.is_empty()
            && self.reconcile_error.is_none()
            && self.aborted.is_none()
    }
}

/// Labels a rollback can target, newest first.
pub fn candidates(history: &VersionStore, limit: Option<usize>) -> Result<Vec<Label>, SyncError> {
    let mut labels = history.list_labels(&LabelFilter::default(), None)?;
    labels.retain(|l| matches!(l.kind, LabelKind::Init | LabelKind::Push | LabelKind::Rollback));
    if let Some(n) = limit {
        labels.truncate(n);
    }
    Ok(labels)
}

/// Restore the mutable target to `reference` (a label or checkpoint id).
pub fn rollback(ctx: &Context<'_>, reference: &str) -> Result<RollbackReport, SyncError> {
    let history = ctx.history;
    let _lock = WorkspaceLock::acquire(history.workspace())?;

    let checkpoint = history.resolve(reference)?;
    let target = &ctx.config.mutable.id;
    guard::check(ctx.remote, target, false).require_safe(target)?;
    tracing::info!("rollback {} to {reference} ({})", ctx.config.mutable, checkpoint.short());

    history.snapshot(&format!("pre-rollback: {reference}"))?;
    let tree = history.read_tree(&checkpoint.0)?;
    let restored: BTreeSet<ItemKey> = history.materialize(&checkpoint.0)?.into_iter().collect();

    let settle = wait_until_ready(ctx.remote, target, ctx.settle);
    let items = tree
        .into_iter()
        .map(|(key, bytes)| Item::from_bytes(key, bytes));
    let uploads = upload_all(ctx.remote, target, items);
    if uploads.succeeded.is_empty() {
        if let Some(e) = &uploads.aborted {
            return Err(e.clone().into());
        }
    }

    let mut aborted = uploads.aborted.clone();
    let mut reconcile_error = None;
    let mut deletes = BatchOutcome::default();
    if aborted.is_none() {
        match ctx.remote.list_items(target) {
            Ok(listing) => {
                let stale: Vec<ItemKey> = listing
                    .into_iter()
                    .map(|s| s.key)
                    .filter(|k| !restored.contains(k))
                    .collect();
                deletes = delete_all(ctx.remote, target, stale);
                aborted = deletes.aborted.clone();
            }
            Err(e) if e.aborts_batch() => aborted = Some(e),
            Err(e) => {
                tracing::warn!("listing {target} failed ({e}); skipping reconciliation");
                reconcile_error = Some(e);
            }
        }
    } else {
        tracing::warn!("uploads to {target} aborted; skipping reconciliation");
    }

    // Local extras go too, unless they still exist remotely.
    if reconcile_error.is_none() && aborted.is_none() {
        let still_remote: BTreeSet<&ItemKey> = deletes.failed.iter().map(|f| &f.key).collect();
        for key in history.working_files()? {
            if !restored.contains(&key) && !still_remote.contains(&key) {
                history.remove_item(&key)?;
            }
        }
    }

    let message = format!("rollback to {reference}");
    let done = history.snapshot(&message)?;
    let name = history.available_name(&format!("{reference}-rollback-{}", Utc::now().timestamp()))?;
    let label = history.label(&done.id, &name, LabelKind::Rollback, &message)?;

    Ok(RollbackReport {
        target_label: reference.to_string(),
        checkpoint,
        settle,
        uploaded: uploads.succeeded,
        upload_failures: uploads.failed,
        deleted: deletes.succeeded,
        delete_failures: deletes.failed,
        reconcile_error,
        aborted,
        label,
    })
}
