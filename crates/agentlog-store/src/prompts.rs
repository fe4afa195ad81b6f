//! Append-only journal of user prompts, one JSON line each.
//!
//! Prompts arrive at a different cadence than invocations and are only
//! read once, by the session summarizer, after the session has ended.
//! Appends take a lock against concurrent prompt events; the read path
//! deliberately does not, since by then no writer is live and a torn
//! final line would be skipped like any malformed line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use agentlog_core::paths::{lock_path, prompts_file};

use crate::errors::Result;
use crate::lock::FileLock;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// One prompt the user submitted during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptEntry {
    /// Submission time, RFC 3339.
    pub timestamp: String,
    /// Session the prompt belongs to.
    pub session_id: String,
    /// Prompt text, already truncated to the journal cap.
    pub prompt: String,
    /// Local date (`YYYY-MM-DD`) of submission.
    pub date: String,
}

/// The prompt journal of one project.
#[derive(Debug)]
pub struct PromptLog {
    file: PathBuf,
    lock_file: PathBuf,
}

impl PromptLog {
    /// Journal of the project rooted at `root`.
    pub fn new(root: &Path) -> Self {
        let file = prompts_file(root);
        let lock_file = lock_path(&file);
        Self { file, lock_file }
    }

    /// Append one prompt as a JSON line, under the journal lock.
    pub fn append(&self, entry: &PromptEntry) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut lock = FileLock::new(&self.lock_file).with_timeout(LOCK_TIMEOUT);
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

    /// All prompts recorded for `session_id`, in journal order.
    ///
    /// Degrades to an empty list when the journal is missing or
    /// unreadable; malformed lines are skipped.
    #[must_use]
    pub fn read_session(&self, session_id: &str) -> Vec<PromptEntry> {
        let content = match std::fs::read_to_string(&self.file) {
            Ok(content) => content,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(error = %err, "prompt journal unreadable");
                }
                return Vec::new();
            }
        };
        content
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                serde_json::from_str::<PromptEntry>(line)
                    .ok()
                    .filter(|entry| entry.session_id == session_id)
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(session: &str, text: &str) -> PromptEntry {
        PromptEntry {
            timestamp: "2026-08-22T09:15:00".into(),
            session_id: session.into(),
            prompt: text.into(),
            date: "2026-08-22".into(),
        }
    }

    #[test]
    fn append_then_read_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let log = PromptLog::new(root.path());
        log.append(&prompt("s1", "first")).unwrap();
        log.append(&prompt("s1", "second")).unwrap();

        let read = log.read_session("s1");
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].prompt, "first");
        assert_eq!(read[1].prompt, "second");
    }

    #[test]
    fn read_filters_other_sessions() {
        let root = tempfile::tempdir().unwrap();
        let log = PromptLog::new(root.path());
        log.append(&prompt("s1", "mine")).unwrap();
        log.append(&prompt("s2", "theirs")).unwrap();

        let read = log.read_session("s1");
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].prompt, "mine");
    }

    #[test]
    fn read_missing_journal_is_empty() {
        let root = tempfile::tempdir().unwrap();
        assert!(PromptLog::new(root.path()).read_session("s1").is_empty());
    }

    #[test]
    fn read_skips_malformed_lines() {
        let root = tempfile::tempdir().unwrap();
        let log = PromptLog::new(root.path());
        log.append(&prompt("s1", "kept")).unwrap();
        let path = root.path().join(".claude/logs/agents/user_prompts.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("not json\n");
        std::fs::write(&path, content).unwrap();

        assert_eq!(log.read_session("s1").len(), 1);
    }
}
