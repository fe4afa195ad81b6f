//! TTL-bounded correlation cache bridging start and stop events.
//!
//! An invocation's start and stop are observed by two different
//! processes. The start handler records what it knows under a composite
//! `{session_id}_{invocation_id}` key; the stop handler loads the map and
//! looks the key up. The whole map lives in one JSON file in the per-user
//! cache directory.
//!
//! `load` and `save` each take the lock separately, so a read-modify-write
//! is not one critical section. That is safe here only because each key
//! has a single writer path; two processes saving around the same moment
//! race, and the last save wins, possibly dropping the other's key. The
//! composite key makes that collision rare enough to accept.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde::{Deserialize, Serialize};

use agentlog_core::paths::secure_cache_dir;
use agentlog_core::time::parse_timestamp;
use agentlog_core::Limits;

use crate::errors::Result;
use crate::lock::FileLock;

const CACHE_FILE: &str = "sessions.json";
const CACHE_LOCK: &str = "sessions.lock";
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// What the start handler knew about an in-flight invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheEntry {
    /// Invocation start time, RFC 3339.
    pub start_ts: String,
    /// Subagent type launched.
    pub subagent: String,
    /// Local date (`YYYY-MM-DD`) of the start, used for log partitioning.
    pub date: String,
    /// Free-text task description.
    pub description: String,
    /// Task prompt, already truncated to the prompt cap.
    pub prompt: String,
    /// Model requested for the subagent, when given.
    pub model: Option<String>,
    /// Working directory at start time.
    pub cwd: String,
}

/// The on-disk map of in-flight invocations.
#[derive(Debug)]
pub struct CorrelationCache {
    file: PathBuf,
    lock_file: PathBuf,
    ttl: Duration,
}

impl CorrelationCache {
    /// Cache rooted in `dir`, pruning entries older than `ttl` on load.
    pub fn new(dir: &Path, ttl: Duration) -> Self {
        Self {
            file: dir.join(CACHE_FILE),
            lock_file: dir.join(CACHE_LOCK),
            ttl,
        }
    }

    /// Cache in the per-user secure cache directory.
    pub fn open_default(limits: &Limits) -> Result<Self> {
        Ok(Self::new(&secure_cache_dir()?, limits.cache_ttl))
    }

    /// Composite key correlating a stop event with its start entry.
    #[must_use]
    pub fn key(session_id: &str, invocation_id: &str) -> String {
        format!("{session_id}_{invocation_id}")
    }

    /// Load the current mapping, pruning expired entries before returning.
    ///
    /// Every failure mode (lock contention, missing file, corrupt JSON)
    /// degrades to an empty map with a logged warning: a lost correlation
    /// costs one log's start time, while an error here would cost the
    /// whole invocation record.
    #[must_use]
    pub fn load(&self) -> HashMap<String, CacheEntry> {
        let mut lock = FileLock::new(&self.lock_file).with_timeout(LOCK_TIMEOUT);
        if let Err(err) = lock.acquire() {
            tracing::warn!(error = %err, "cache lock not acquired, treating cache as empty");
            return HashMap::new();
        }
        let entries = match std::fs::read_to_string(&self.file) {
            Ok(content) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&content) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(error = %err, "cache file corrupt, starting fresh");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                tracing::warn!(error = %err, "cache file unreadable, treating cache as empty");
                HashMap::new()
            }
        };
        drop(lock);
        self.prune(entries)
    }

    /// Persist the full mapping, replacing the previous file contents.
    pub fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        let mut lock = FileLock::new(&self.lock_file).with_timeout(LOCK_TIMEOUT);
        lock.acquire()?;
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.file, json)?;
        Ok(())
    }

    /// Keep only entries whose start time is within the retention horizon.
    ///
    /// Entries with missing or unparseable start times are dropped too;
    /// they could otherwise survive forever.
    fn prune(&self, entries: HashMap<String, CacheEntry>) -> HashMap<String, CacheEntry> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let cutoff = Local::now() - ttl;
        entries
            .into_iter()
            .filter(|(_, entry)| {
                parse_timestamp(&entry.start_ts).is_some_and(|start| start > cutoff)
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::SecondsFormat;

    use super::*;

    fn cache(dir: &tempfile::TempDir) -> CorrelationCache {
        CorrelationCache::new(dir.path(), Duration::from_secs(24 * 60 * 60))
    }

    fn entry_started_at(ts: String) -> CacheEntry {
        CacheEntry {
            start_ts: ts,
            subagent: "general-purpose".into(),
            date: "2026-08-22".into(),
            description: "inspect the build".into(),
            prompt: "look at the failing step".into(),
            model: Some("primary".into()),
            cwd: "/work".into(),
        }
    }

    fn recent_ts() -> String {
        Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    fn old_ts(hours: i64) -> String {
        (Local::now() - chrono::Duration::hours(hours))
            .to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    #[test]
    fn key_is_composite() {
        assert_eq!(CorrelationCache::key("sess", "toolu_01"), "sess_toolu_01");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cache(&dir).load().is_empty());
    }

    #[test]
    fn load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sessions.json"), "{not json").unwrap();
        assert!(cache(&dir).load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let mut entries = HashMap::new();
        let entry = entry_started_at(recent_ts());
        let _ = entries.insert(CorrelationCache::key("s1", "t1"), entry.clone());
        cache.save(&entries).unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["s1_t1"], entry);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let mut first = HashMap::new();
        let _ = first.insert("s1_a".to_owned(), entry_started_at(recent_ts()));
        cache.save(&first).unwrap();

        let mut second = HashMap::new();
        let _ = second.insert("s1_b".to_owned(), entry_started_at(recent_ts()));
        cache.save(&second).unwrap();

        let loaded = cache.load();
        assert!(!loaded.contains_key("s1_a"));
        assert!(loaded.contains_key("s1_b"));
    }

    #[test]
    fn expired_entries_pruned_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let mut entries = HashMap::new();
        let _ = entries.insert("old".to_owned(), entry_started_at(old_ts(25)));
        let _ = entries.insert("fresh".to_owned(), entry_started_at(old_ts(1)));
        cache.save(&entries).unwrap();

        let loaded = cache.load();
        assert!(!loaded.contains_key("old"));
        assert!(loaded.contains_key("fresh"));
    }

    #[test]
    fn unparseable_start_ts_pruned_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let mut entries = HashMap::new();
        let _ = entries.insert("bad".to_owned(), entry_started_at("not a time".into()));
        cache.save(&entries).unwrap();
        assert!(cache.load().is_empty());
    }

    #[test]
    fn unknown_fields_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let json = format!(
            r#"{{"k": {{"start_ts": "{}", "subagent": "explore", "added_later": true}}}}"#,
            recent_ts()
        );
        std::fs::write(dir.path().join("sessions.json"), json).unwrap();
        let loaded = cache(&dir).load();
        assert_eq!(loaded["k"].subagent, "explore");
        assert_eq!(loaded["k"].description, "");
    }
}
