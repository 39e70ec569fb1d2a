//! # themevault-remote
//!
//! Remote Store Client: typed item and target operations over the store's
//! HTTP API, paced to stay under the remote's leaky-bucket ceiling.
//!
//! - [`RemoteStore`]: the operations every orchestrator consumes
//! - [`HttpRemoteStore`]: blocking `ureq` implementation
//! - [`MemoryStore`]: in-process implementation with failure injection
//! - [`RemoteError`]: the failure taxonomy

pub mod error;
pub mod http;
pub mod memory;
pub mod pacer;
pub mod store;
pub mod wire;

pub use error::RemoteError;
pub use http::HttpRemoteStore;
pub use memory::{Call, MemoryStore, Op};
pub use pacer::{BucketUsage, Pacer};
pub use store::{ItemSummary, RemoteStore};
