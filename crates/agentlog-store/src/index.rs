//! Append-only invocation index and its stabilization read protocol.
//!
//! Each completed invocation becomes one JSON line in `index.jsonl`,
//! appended under the index lock. The session summarizer races against
//! analyzer processes that are still appending, so reads retry until the
//! number of matching entries stops growing, taking the writer's lock on
//! every pass so a half-written line is never observed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use agentlog_core::paths::{index_file, lock_path};

use crate::errors::Result;
use crate::lock::FileLock;

const WRITE_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const READ_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// One completed invocation, as recorded in the index.
///
/// Unknown fields in stored lines are ignored so older binaries can read
/// an index written by newer ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexEntry {
    /// Local date (`YYYY-MM-DD`) of the invocation.
    pub date: String,
    /// Session the invocation belongs to.
    pub session: String,
    /// Subagent type.
    pub subagent: String,
    /// Branch label at invocation time, `"unknown"` when absent.
    pub branch: String,
    /// Invocation start time, RFC 3339.
    pub start: String,
    /// Invocation end time, RFC 3339.
    pub end: String,
    /// Wall-clock duration, when both timestamps parsed.
    pub duration_ms: Option<i64>,
    /// Completion status.
    pub status: String,
    /// Rendered log path, relative to the agent log directory.
    pub log_file: String,
}

/// How patiently [`EventIndex::read_session`] waits for racing writers.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional passes after the first.
    pub max_retries: usize,
    /// Pause between passes.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// The append-only invocation index of one project.
#[derive(Debug)]
pub struct EventIndex {
    file: PathBuf,
    lock_file: PathBuf,
}

impl EventIndex {
    /// Index of the project rooted at `root`.
    pub fn new(root: &Path) -> Self {
        let file = index_file(root);
        let lock_file = lock_path(&file);
        Self { file, lock_file }
    }

    /// Append one entry as a JSON line, under the index lock.
    ///
    /// Pure append: concurrent writers contend on the lock but never
    /// rewrite each other's lines.
    pub fn append(&self, entry: &IndexEntry) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut lock = FileLock::new(&self.lock_file).with_timeout(WRITE_LOCK_TIMEOUT);
        lock.acquire()?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        std::io::Write::write_all(&mut file, line.as_bytes())?;
        Ok(())
    }

    /// Read all entries for `session_id`, waiting out racing writers.
    ///
    /// Performs up to `max_retries + 1` passes, each under the writer's
    /// lock. A pass whose matching count equals the previous pass's
    /// non-zero count is taken as evidence the writers have finished and
    /// returned early. This favors bounded latency over completeness: a
    /// writer that pauses longer than one pass interval and then appends
    /// more will be missed, within the retry budget's tolerance.
    #[must_use]
    pub fn read_session(&self, session_id: &str, policy: &RetryPolicy) -> Vec<IndexEntry> {
        let mut entries = Vec::new();
        let mut last_count: Option<usize> = None;

        for attempt in 0..=policy.max_retries {
            entries = Vec::new();

            if !self.file.exists() {
                if attempt < policy.max_retries {
                    std::thread::sleep(policy.retry_delay);
                    continue;
                }
                return entries;
            }

            match self.read_pass(session_id) {
                Ok(read) => entries = read,
                Err(err) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %err,
                        "index read failed"
                    );
                    if attempt < policy.max_retries {
                        std::thread::sleep(policy.retry_delay);
                        continue;
                    }
                }
            }

            if last_count == Some(entries.len()) && !entries.is_empty() {
                break;
            }
            last_count = Some(entries.len());

            if attempt < policy.max_retries {
                std::thread::sleep(policy.retry_delay);
            }
        }
        entries
    }

    /// One locked scan of the index, filtered to `session_id`.
    fn read_pass(&self, session_id: &str) -> Result<Vec<IndexEntry>> {
        let mut lock = FileLock::new(&self.lock_file).with_timeout(READ_LOCK_TIMEOUT);
        lock.acquire()?;
        let content = std::fs::read_to_string(&self.file)?;
        Ok(content
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                serde_json::from_str::<IndexEntry>(line)
                    .ok()
                    .filter(|entry| entry.session == session_id)
            })
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(session: &str, start: &str) -> IndexEntry {
        IndexEntry {
            date: "2026-08-22".into(),
            session: session.into(),
            subagent: "explore".into(),
            branch: "main".into(),
            start: start.into(),
            end: "2026-08-22T10:00:05".into(),
            duration_ms: Some(5000),
            status: "success".into(),
            log_file: "2026-08-22/main/100000_explore_ab12cd34.md".into(),
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            retry_delay: Duration::from_millis(10),
        }
    }

    // ── append ──────────────────────────────────────────────────────

    #[test]
    fn append_creates_file_and_parents() {
        let root = tempfile::tempdir().unwrap();
        let index = EventIndex::new(root.path());
        index.append(&entry("s1", "2026-08-22T10:00:00")).unwrap();
        assert!(root
            .path()
            .join(".claude/logs/agents/index.jsonl")
            .exists());
    }

    #[test]
    fn append_accumulates_lines() {
        let root = tempfile::tempdir().unwrap();
        let index = EventIndex::new(root.path());
        index.append(&entry("s1", "2026-08-22T10:00:00")).unwrap();
        index.append(&entry("s1", "2026-08-22T10:01:00")).unwrap();
        let content =
            std::fs::read_to_string(root.path().join(".claude/logs/agents/index.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn append_does_not_hold_lock_afterwards() {
        let root = tempfile::tempdir().unwrap();
        let index = EventIndex::new(root.path());
        index.append(&entry("s1", "2026-08-22T10:00:00")).unwrap();
        assert!(!root
            .path()
            .join(".claude/logs/agents/index.jsonl.lock")
            .exists());
    }

    // ── read_session ────────────────────────────────────────────────

    #[test]
    fn read_missing_index_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let index = EventIndex::new(root.path());
        assert!(index.read_session("s1", &quick_policy()).is_empty());
    }

    #[test]
    fn read_filters_by_session() {
        let root = tempfile::tempdir().unwrap();
        let index = EventIndex::new(root.path());
        index.append(&entry("s1", "2026-08-22T10:00:00")).unwrap();
        index.append(&entry("s2", "2026-08-22T10:00:01")).unwrap();
        index.append(&entry("s1", "2026-08-22T10:00:02")).unwrap();

        let read = index.read_session("s1", &quick_policy());
        assert_eq!(read.len(), 2);
        assert!(read.iter().all(|e| e.session == "s1"));
    }

    #[test]
    fn read_skips_malformed_lines() {
        let root = tempfile::tempdir().unwrap();
        let index = EventIndex::new(root.path());
        index.append(&entry("s1", "2026-08-22T10:00:00")).unwrap();
        let path = root.path().join(".claude/logs/agents/index.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{broken\n\n");
        std::fs::write(&path, content).unwrap();
        index.append(&entry("s1", "2026-08-22T10:01:00")).unwrap();

        assert_eq!(index.read_session("s1", &quick_policy()).len(), 2);
    }

    #[test]
    fn read_tolerates_unknown_fields() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join(".claude/logs/agents/index.jsonl");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "{\"session\": \"s1\", \"subagent\": \"explore\", \"from_the_future\": [1]}\n",
        )
        .unwrap();
        let index = EventIndex::new(root.path());
        let read = index.read_session("s1", &quick_policy());
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].branch, "");
    }

    #[test]
    fn read_stabilizes_against_live_writer() {
        let root = tempfile::tempdir().unwrap();
        let index = EventIndex::new(root.path());

        // All appends happen in the background, so early passes see zero
        // matches, which the protocol never mistakes for stability.
        let writer_root = root.path().to_path_buf();
        let writer = std::thread::spawn(move || {
            let index = EventIndex::new(&writer_root);
            for i in 0..3 {
                std::thread::sleep(Duration::from_millis(20));
                index
                    .append(&entry("s1", &format!("2026-08-22T10:00:0{i}")))
                    .unwrap();
            }
            index.append(&entry("other", "2026-08-22T10:00:09")).unwrap();
        });

        let policy = RetryPolicy {
            max_retries: 6,
            retry_delay: Duration::from_millis(100),
        };
        let read = index.read_session("s1", &policy);
        writer.join().unwrap();

        assert_eq!(read.len(), 3);
        assert!(read.iter().all(|e| e.session == "s1"));
    }
}
