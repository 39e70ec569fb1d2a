//! Per-item batch execution shared by the orchestrators.
//!
//! Each item succeeds or fails on its own. Credential failures (`Auth`,
//! `Forbidden`) would fail every remaining item, so they abort the batch;
//! any other failure is recorded and the batch goes on.

use themevault_core::{Item, ItemKey, TargetId};
use themevault_remote::{RemoteError, RemoteStore};

/// One item that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub key: ItemKey,
    pub error: RemoteError,
}

#[derive(Debug, Default)]
pub(crate) struct BatchOutcome {
    pub succeeded: Vec<ItemKey>,
    pub failed: Vec<ItemFailure>,
    /// Credential failure that stopped the batch; later items were not tried.
    pub aborted: Option<RemoteError>,
}

impl BatchOutcome {
    /// Record one result; returns `false` once the batch must stop.
    fn record(&mut self, key: ItemKey, result: Result<(), RemoteError>) -> bool {
        match result {
            Ok(()) => self.succeeded.push(key),
            Err(e) if e.aborts_batch() => {
                tracing::warn!("{key}: {e}; aborting batch");
                self.failed.push(ItemFailure {
                    key,
                    error: e.clone(),
                });
                self.aborted = Some(e);
                return false;
            }
            Err(e) => {
                tracing::warn!("{key}: {e}");
                self.failed.push(ItemFailure { key, error: e });
            }
        }
        true
    }
}

/// Upload every item to `target`, stopping at the first credential failure.
pub(crate) fn upload_all(
    remote: &dyn RemoteStore,
    target: &TargetId,
    items: impl IntoIterator<Item = Item>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for item in items {
        tracing::debug!("upload {} -> {target}", item.key);
        let result = remote.put_item(target, &item);
        if !outcome.record(item.key, result) {
            break;
        }
    }
    tracing::info!(
        "uploaded {} item(s) to {target}, {} failed",
        outcome.succeeded.len(),
        outcome.failed.len()
    );
    outcome
}

/// Delete every key from `target`. A key already gone counts as deleted.
pub(crate) fn delete_all(
    remote: &dyn RemoteStore,
    target: &TargetId,
    keys: impl IntoIterator<Item = ItemKey>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for key in keys {
        tracing::debug!("delete {key} from {target}");
        let result = match remote.delete_item(target, &key) {
            Err(RemoteError::NotFound { .. }) => Ok(()),
            other => other,
        };
        if !outcome.record(key, result) {
            break;
        }
    }
    tracing::info!(
        "deleted {} item(s) from {target}, {} failed",
        outcome.succeeded.len(),
        outcome.failed.len()
    );
    outcome
}
