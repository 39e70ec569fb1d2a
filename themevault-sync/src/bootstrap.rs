//! Initial import of the mutable target into a fresh workspace.

use themevault_core::ItemKey;
use themevault_history::{label::INIT_LABEL, Label, LabelKind};

use crate::batch::ItemFailure;
use crate::{Context, SyncError, WorkspaceLock};

#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub imported: Vec<ItemKey>,
    pub skipped: Vec<ItemFailure>,
    pub label: Label,
}

/// Pull every item of the mutable target into the working tree and label
/// the result `v0-init`. Read-only towards the remote, so no guard check.
pub fn bootstrap(ctx: &Context<'_>) -> Result<BootstrapReport, SyncError> {
    let history = ctx.history;
    let _lock = WorkspaceLock::acquire(history.workspace())?;
    if history.find_label(INIT_LABEL)?.is_some() {
        return Err(SyncError::AlreadyInitialized {
            label: INIT_LABEL.to_string(),
        });
    }

    let target = &ctx.config.mutable.id;
    let mut imported = Vec::new();
    let mut skipped = Vec::new();
    for summary in ctx.remote.list_items(target)? {
        match ctx.remote.get_item(target, &summary.key) {
            Ok(Some(item)) => {
                history.write_item(&item.key, item.bytes())?;
                imported.push(item.key);
            }
            Ok(None) => tracing::debug!("{}: listed but gone", summary.key),
            Err(e) if e.aborts_batch() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("{}: {e}", summary.key);
                skipped.push(ItemFailure {
                    key: summary.key,
                    error: e,
                });
            }
        }
    }

    let checkpoint = history.snapshot("initial import")?;
    let label = history.label(
        &checkpoint.id,
        INIT_LABEL,
        LabelKind::Init,
        &format!("initial import of {}", ctx.config.mutable),
    )?;
    tracing::info!("imported {} item(s) from {}", imported.len(), ctx.config.mutable);
    Ok(BootstrapReport {
        imported,
        skipped,
        label,
    })
}
