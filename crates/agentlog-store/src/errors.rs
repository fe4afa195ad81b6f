//! Error types for the shared-state stores.
//!
//! [`LockError`] is deliberately separate from [`StoreError`] so callers
//! can distinguish lock contention (expected under load, degrade quietly)
//! from real I/O or serialization failures.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from the cross-process file lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock stayed contended past the caller's deadline.
    #[error("timed out acquiring lock {} after {timeout:?}", path.display())]
    Timeout {
        /// The lock file that stayed contended.
        path: PathBuf,
        /// How long acquisition was attempted.
        timeout: Duration,
    },

    /// Creating or inspecting the lock file failed.
    #[error("lock file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur reading or writing shared store files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not acquire the guarding lock.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Filesystem error on the store file itself.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
