//! themevault core library: domain types, config persistence, errors.
//!
//! - [`types`]: item keys, items, media kinds, targets and roles
//! - [`config`]: the workspace config record: load / save
//! - [`paths`]: workspace layout
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{Config, Pacing};
pub use error::CoreError;
pub use types::{
    Content, Item, ItemKey, MediaKind, TargetId, TargetInfo, TargetRef, TargetRole,
};
