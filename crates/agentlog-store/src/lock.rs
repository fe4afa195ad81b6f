//! Cross-process mutual exclusion over a lock file.
//!
//! Every shared file in the log pipeline is guarded by a sibling lock
//! file, claimed with atomic create-exclusive (`O_CREAT | O_EXCL`). The
//! holders are short-lived processes with no channel between them, so a
//! crashed holder is recovered by age: a lock file older than the
//! staleness threshold is renamed to a quarantine name and deleted, and
//! the rename's atomicity decides the race when two processes attempt
//! recovery at once.
//!
//! [`FileLock`] releases on drop, so the lock cannot leak on an early
//! return from a critical section.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use crate::errors::LockError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
#[cfg(windows)]
const RELEASE_DELAY: Duration = Duration::from_millis(10);

/// An exclusive, timeout-bounded claim on a named filesystem path.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    timeout: Duration,
    stale_after: Duration,
    handle: Option<File>,
}

impl FileLock {
    /// A lock on `path`, not yet acquired, with a 10s acquisition timeout.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
            handle: None,
        }
    }

    /// Set the acquisition timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the age beyond which an existing lock file is treated as
    /// abandoned and reclaimed.
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Whether this handle currently holds the lock.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    /// Block until the lock is acquired or the timeout elapses.
    ///
    /// On each contended attempt the existing lock file's age is checked;
    /// a stale file is quarantined (rename then delete) and the attempt
    /// retried immediately. Acquiring an already-held lock is a no-op.
    pub fn acquire(&mut self) -> Result<(), LockError> {
        if self.handle.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let start = Instant::now();

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut file) => {
                    // Holder pid, written for post-mortem diagnosis only.
                    let _ = write!(file, "{}", std::process::id());
                    self.handle = Some(file);
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    match lock_file_age(&self.path) {
                        Ok(age) => {
                            if age > self.stale_after && self.quarantine_stale() {
                                continue;
                            }
                        }
                        // The holder released between our attempts.
                        Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                        Err(_) => {}
                    }
                    if start.elapsed() > self.timeout {
                        return Err(LockError::Timeout {
                            path: self.path.clone(),
                            timeout: self.timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Release the lock.
    ///
    /// Idempotent and infallible from the caller's perspective: release
    /// runs on cleanup paths where a new failure mode would be worse than
    /// a leftover lock file, which the staleness recovery handles anyway.
    /// A handle that never acquired the lock leaves the file alone.
    pub fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        drop(handle);
        // NTFS can report the handle as still open for a moment after close.
        #[cfg(windows)]
        std::thread::sleep(RELEASE_DELAY);
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove lock file"
                );
            }
        }
    }

    /// Rename the existing lock file to a quarantine name and delete it.
    ///
    /// Returns true when the path is clear for another creation attempt.
    /// Rename-then-delete rather than delete-in-place: of two processes
    /// recovering the same stale lock, only one rename succeeds, and the
    /// loser just retries.
    fn quarantine_stale(&self) -> bool {
        let quarantine = self.path.with_extension("stale");
        match fs::rename(&self.path, &quarantine) {
            Ok(()) => {
                tracing::warn!(path = %self.path.display(), "reclaimed stale lock file");
                if let Err(err) = fs::remove_file(&quarantine) {
                    if err.kind() != io::ErrorKind::NotFound {
                        tracing::debug!(
                            path = %quarantine.display(),
                            error = %err,
                            "failed to delete quarantined lock file"
                        );
                    }
                }
                true
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(_) => false,
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock_file_age(path: &Path) -> io::Result<Duration> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
