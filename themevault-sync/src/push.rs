//! Push: upload working-tree items to the mutable target.
//!
//! ## Protocol
//!
//! 1. Guard check on the mutable target.
//! 2. Stash the local bytes of every key, pull the remote version of each
//!    key into the working tree and snapshot it (`pre-push`). Restore the
//!    stash.
//! 3. Upload each key; outcomes are independent per key.
//! 4. Pull back every key, snapshot (`post-push`) and label `v<N>-push`
//!    if anything uploaded. Edits the remote did not take are restored
//!    afterwards and stay uncommitted.
//!
//! A credential failure stops the uploads; whatever already went out is
//! still snapshotted and labelled, and the report carries the error.
//!
//! Push never deletes remote items.

use std::collections::{BTreeMap, BTreeSet};

use themevault_core::{Item, ItemKey};
use themevault_history::{label::push_label_name, CheckpointId, Label, LabelKind};
use themevault_remote::RemoteError;

use crate::batch::{upload_all, ItemFailure};
use crate::{guard, Context, SyncError, WorkspaceLock};

#[derive(Debug, Clone)]
pub struct PushReport {
    pub uploaded: Vec<ItemKey>,
    pub failed: Vec<ItemFailure>,
    /// Credential failure that stopped the batch early.
    pub aborted: Option<RemoteError>,
    pub label: Label,
    pub pre_checkpoint: CheckpointId,
    pub post_checkpoint: CheckpointId,
}

/// Push `keys` from the working tree to the mutable target.
pub fn push(ctx: &Context<'_>, keys: &[ItemKey], message: Option<&str>) -> Result<PushReport, SyncError> {
    let keys: BTreeSet<ItemKey> = keys.iter().cloned().collect();
    if keys.is_empty() {
        return Err(SyncError::EmptyBatch);
    }
    let history = ctx.history;

    let mut stash = BTreeMap::new();
    let mut missing = Vec::new();
    for key in &keys {
        match history.read_item(key)? {
            Some(bytes) => {
                stash.insert(key.clone(), bytes);
            }
            None => missing.push(key.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(SyncError::MissingLocal { keys: missing });
    }

    let _lock = WorkspaceLock::acquire(history.workspace())?;
    let target = &ctx.config.mutable.id;
    guard::check(ctx.remote, target, false).require_safe(target)?;

    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| format!("push {} item(s)", keys.len()));
    tracing::info!("push to {}: {message}", ctx.config.mutable);

    // Step 2: pre-write snapshot of the remote state of these keys.
    let pre = pull_remote(ctx, &keys).and_then(|()| {
        history
            .snapshot(&format!("pre-push: {message}"))
            .map_err(SyncError::from)
    });
    restore(ctx, &stash)?;
    let pre = pre?;

    // Step 3: upload.
    let items = stash
        .iter()
        .map(|(key, bytes)| Item::from_bytes(key.clone(), bytes.clone()));
    let outcome = upload_all(ctx.remote, target, items);
    let uploaded: BTreeSet<ItemKey> = outcome.succeeded.iter().cloned().collect();

    // Step 4: record what the remote now holds, then put unpushed edits
    // back as uncommitted changes.
    let post = record_remote(ctx, &keys, &uploaded, &stash, &pre.id).and_then(|()| {
        history
            .snapshot(&format!("post-push: {message}"))
            .map_err(SyncError::from)
    });
    let unpushed: BTreeMap<ItemKey, Vec<u8>> = stash
        .into_iter()
        .filter(|(key, _)| !uploaded.contains(key))
        .collect();
    restore(ctx, &unpushed)?;
    let post = post?;

    if outcome.succeeded.is_empty() {
        if let Some(e) = &outcome.aborted {
            return Err(e.clone().into());
        }
        return Err(SyncError::TotalFailure {
            failed: outcome.failed.len(),
            pre_checkpoint: pre.id,
        });
    }

    let name = push_label_name(history.next_version()?);
    let label = history.label(&post.id, &name, LabelKind::Push, &message)?;
    if let Some(e) = &outcome.aborted {
        tracing::warn!(
            "push aborted after {} upload(s) ({e}); state recorded as {name}",
            outcome.succeeded.len()
        );
    }
    Ok(PushReport {
        uploaded: outcome.succeeded,
        failed: outcome.failed,
        aborted: outcome.aborted,
        label,
        pre_checkpoint: pre.id,
        post_checkpoint: post.id,
    })
}

/// Write the remote's current version of every key into the working tree.
///
/// When the re-fetch itself fails, fall back to what the upload outcome
/// implies: the stashed bytes for uploaded keys, the pre-push state
/// otherwise.
fn record_remote(
    ctx: &Context<'_>,
    keys: &BTreeSet<ItemKey>,
    uploaded: &BTreeSet<ItemKey>,
    stash: &BTreeMap<ItemKey, Vec<u8>>,
    pre: &CheckpointId,
) -> Result<(), SyncError> {
    let target = &ctx.config.mutable.id;
    let pre_tree = ctx.history.read_tree(&pre.0)?;
    for key in keys {
        let bytes = match ctx.remote.get_item(target, key) {
            Ok(found) => found.map(|item| item.content.into_bytes()),
            Err(e) => {
                tracing::warn!("{key}: re-fetch failed ({e}); using the upload outcome");
                if uploaded.contains(key) {
                    stash.get(key).cloned()
                } else {
                    pre_tree.get(key).cloned()
                }
            }
        };
        match bytes {
            Some(bytes) => {
                ctx.history.write_item(key, &bytes)?;
            }
            None => {
                ctx.history.remove_item(key)?;
            }
        }
    }
    Ok(())
}

/// Replace each key in the working tree with its remote version; keys the
/// remote does not hold are removed.
fn pull_remote(ctx: &Context<'_>, keys: &BTreeSet<ItemKey>) -> Result<(), SyncError> {
    let target = &ctx.config.mutable.id;
    for key in keys {
        match ctx.remote.get_item(target, key)? {
            Some(item) => {
                ctx.history.write_item(key, item.bytes())?;
            }
            None => {
                ctx.history.remove_item(key)?;
            }
        }
    }
    Ok(())
}

fn restore(ctx: &Context<'_>, stash: &BTreeMap<ItemKey, Vec<u8>>) -> Result<(), SyncError> {
    for (key, bytes) in stash {
        ctx.history.write_item(key, bytes)?;
    }
    Ok(())
}
