//! In-process [`RemoteStore`].
//!
//! Holds targets and their items in memory with the same observable
//! semantics as the HTTP store: missing items read as `None`, unknown
//! targets are `NotFound`. Roles can be changed and failures injected
//! between calls, and every call is recorded for inspection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use themevault_core::{Item, ItemKey, MediaKind, TargetId, TargetInfo, TargetRole};

use crate::store::{ItemSummary, RemoteStore};
use crate::RemoteError;

/// Kind of remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Put,
    Delete,
    Info,
}

impl Op {
    pub fn is_write(self) -> bool {
        matches!(self, Op::Put | Op::Delete)
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub target: TargetId,
    pub key: Option<ItemKey>,
}

#[derive(Debug)]
struct MemoryTarget {
    name: String,
    role: String,
    /// Number of upcoming `target_info` calls that report `processing`.
    processing_polls: u32,
    items: BTreeMap<ItemKey, Item>,
}

#[derive(Debug, Default)]
struct MemoryState {
    targets: HashMap<TargetId, MemoryTarget>,
    failures: HashMap<(Op, ItemKey), RemoteError>,
    unreachable: HashSet<TargetId>,
    calls: Vec<Call>,
}

/// Thread-safe in-memory remote store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a target with a wire role string (`"main"`, `"unpublished"`, …).
    pub fn add_target(&self, id: impl Into<TargetId>, name: &str, role: &str) {
        self.lock().targets.insert(
            id.into(),
            MemoryTarget {
                name: name.to_string(),
                role: role.to_string(),
                processing_polls: 0,
                items: BTreeMap::new(),
            },
        );
    }

    pub fn remove_target(&self, id: &TargetId) {
        self.lock().targets.remove(id);
    }

    pub fn set_role(&self, id: &TargetId, role: &str) {
        if let Some(t) = self.lock().targets.get_mut(id) {
            t.role = role.to_string();
        }
    }

    /// Report `processing` for the next `polls` metadata fetches.
    pub fn set_processing(&self, id: &TargetId, polls: u32) {
        if let Some(t) = self.lock().targets.get_mut(id) {
            t.processing_polls = polls;
        }
    }

    /// Make every call against `id` fail with a transport error.
    pub fn set_unreachable(&self, id: &TargetId, unreachable: bool) {
        let mut state = self.lock();
        if unreachable {
            state.unreachable.insert(id.clone());
        } else {
            state.unreachable.remove(id);
        }
    }

    /// Seed an item without recording a call.
    pub fn insert(&self, id: &TargetId, item: Item) {
        if let Some(t) = self.lock().targets.get_mut(id) {
            t.items.insert(item.key.clone(), item);
        }
    }

    /// Make `op` on `key` fail with `err` until cleared.
    pub fn fail(&self, op: Op, key: &ItemKey, err: RemoteError) {
        self.lock().failures.insert((op, key.clone()), err);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Snapshot of the items currently held by `id`.
    pub fn items(&self, id: &TargetId) -> BTreeMap<ItemKey, Item> {
        self.lock()
            .targets
            .get(id)
            .map(|t| t.items.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Write calls (`put` / `delete`) issued against `id`.
    pub fn writes_to(&self, id: &TargetId) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op.is_write() && &c.target == id)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Record the call and return the injected failure, if any.
    fn enter(
        state: &mut MemoryState,
        op: Op,
        target: &TargetId,
        key: Option<&ItemKey>,
    ) -> Result<(), RemoteError> {
        state.calls.push(Call {
            op,
            target: target.clone(),
            key: key.cloned(),
        });
        if state.unreachable.contains(target) {
            return Err(RemoteError::Transport {
                detail: format!("target {target} unreachable"),
            });
        }
        if let Some(key) = key {
            if let Some(err) = state.failures.get(&(op, key.clone())) {
                return Err(err.clone());
            }
        }
        Ok(())
    }
}

fn missing_target(id: &TargetId) -> RemoteError {
    RemoteError::NotFound {
        what: format!("target {id}"),
    }
}

impl RemoteStore for MemoryStore {
    fn list_items(&self, target: &TargetId) -> Result<Vec<ItemSummary>, RemoteError> {
        let mut state = self.lock();
        Self::enter(&mut state, Op::List, target, None)?;
        let t = state.targets.get(target).ok_or_else(|| missing_target(target))?;
        Ok(t.items
            .values()
            .map(|item| ItemSummary {
                key: item.key.clone(),
                content_type: MediaKind::from_key(&item.key).content_type().to_string(),
            })
            .collect())
    }

    fn get_item(&self, target: &TargetId, key: &ItemKey) -> Result<Option<Item>, RemoteError> {
        let mut state = self.lock();
        Self::enter(&mut state, Op::Get, target, Some(key))?;
        let t = state.targets.get(target).ok_or_else(|| missing_target(target))?;
        Ok(t.items.get(key).cloned())
    }

    fn put_item(&self, target: &TargetId, item: &Item) -> Result<(), RemoteError> {
        let mut state = self.lock();
        Self::enter(&mut state, Op::Put, target, Some(&item.key))?;
        let t = state
            .targets
            .get_mut(target)
            .ok_or_else(|| missing_target(target))?;
        t.items.insert(item.key.clone(), item.clone());
        Ok(())
    }

    fn delete_item(&self, target: &TargetId, key: &ItemKey) -> Result<(), RemoteError> {
        let mut state = self.lock();
        Self::enter(&mut state, Op::Delete, target, Some(key))?;
        let t = state
            .targets
            .get_mut(target)
            .ok_or_else(|| missing_target(target))?;
        match t.items.remove(key) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound {
                what: format!("item {key}"),
            }),
        }
    }

    fn target_info(&self, target: &TargetId) -> Result<TargetInfo, RemoteError> {
        let mut state = self.lock();
        Self::enter(&mut state, Op::Info, target, None)?;
        let t = state
            .targets
            .get_mut(target)
            .ok_or_else(|| missing_target(target))?;
        let processing = t.processing_polls > 0;
        t.processing_polls = t.processing_polls.saturating_sub(1);
        Ok(TargetInfo {
            id: target.clone(),
            name: t.name.clone(),
            role: TargetRole::from_wire(&t.role),
            processing,
        })
    }
}
