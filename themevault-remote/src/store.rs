//! The operations the orchestrators need from a remote store.

use themevault_core::{Item, ItemKey, TargetId, TargetInfo};

use crate::RemoteError;

/// One entry of an item listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub key: ItemKey,
    pub content_type: String,
}

/// Typed access to a remote, role-tagged content store.
///
/// Implementations issue calls sequentially; none of them retries on its own.
pub trait RemoteStore {
    /// List every item key held by `target`.
    fn list_items(&self, target: &TargetId) -> Result<Vec<ItemSummary>, RemoteError>;

    /// Fetch one item. `Ok(None)` means the item does not exist (yet).
    fn get_item(&self, target: &TargetId, key: &ItemKey) -> Result<Option<Item>, RemoteError>;

    /// Create or replace one item.
    fn put_item(&self, target: &TargetId, item: &Item) -> Result<(), RemoteError>;

    /// Remove one item.
    fn delete_item(&self, target: &TargetId, key: &ItemKey) -> Result<(), RemoteError>;

    /// Fetch authoritative target metadata, including its role.
    fn target_info(&self, target: &TargetId) -> Result<TargetInfo, RemoteError>;
}
