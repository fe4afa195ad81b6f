//! # agentlog-store
//!
//! Shared on-disk state for the subagent logging pipeline, coordinated
//! across short-lived processes with file locks:
//!
//! - **Lock**: [`FileLock`] create-exclusive file lock with staleness recovery
//! - **Cache**: [`CorrelationCache`] TTL-pruned map keyed by session + invocation
//! - **Index**: [`EventIndex`] append-only invocation log with a stabilization read
//! - **Prompts**: [`PromptLog`] append-only journal of user prompts

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod index;
pub mod lock;
pub mod prompts;

pub use cache::{CacheEntry, CorrelationCache};
pub use errors::{LockError, Result, StoreError};
pub use index::{EventIndex, IndexEntry, RetryPolicy};
pub use lock::FileLock;
pub use prompts::{PromptEntry, PromptLog};
