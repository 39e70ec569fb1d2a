//! # themevault-history
//!
//! Version History Store: an embedded content-addressed store that
//! snapshots the working tree into checkpoints, attaches append-only labels
//! to them, materializes old trees and diffs any two states.
//!
//! Open a store with [`VersionStore::open`] (or [`VersionStore::init`] on a
//! fresh workspace).

pub mod checkpoint;
pub mod diff;
pub mod error;
pub mod label;
pub mod objects;
pub mod store;
pub mod tree;

pub use checkpoint::{Checkpoint, CheckpointId};
pub use diff::{ChangeStatus, FileChange, LineStats};
pub use error::HistoryError;
pub use label::{Label, LabelFilter, LabelKind};
pub use store::VersionStore;
