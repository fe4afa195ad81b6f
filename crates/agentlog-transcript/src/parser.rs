//! Bounded, allow-listed reading of line-delimited transcripts.
//!
//! Transcript paths come from hook payloads and are untrusted; every read
//! goes through the same gate: tilde expansion, allow-list check via
//! canonicalization, then a size cap and an event-count cap. Any failure
//! yields an empty or partial event list, never an error, because a
//! transcript we cannot read safely is a transcript with nothing in it.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use serde_json::Value;

use agentlog_core::paths::{expand_tilde, is_safe_path};

const FIRST_LINE_CAP: u64 = 64 * 1024;

/// Read up to `max_events` JSON events from a transcript file.
///
/// A missing file yields an empty list silently. A path outside
/// `allowed_roots` or a file over `max_size_mb` yields an empty list with
/// a warning. Blank and malformed lines are skipped; hitting the event
/// cap keeps what was collected so far.
#[must_use]
pub fn read_events(
    path: &str,
    allowed_roots: &[PathBuf],
    max_size_mb: u64,
    max_events: usize,
) -> Vec<Value> {
    let mut events = Vec::new();
    let expanded = expand_tilde(path);

    if !expanded.exists() {
        return events;
    }
    if !is_safe_path(&expanded, allowed_roots) {
        tracing::warn!(
            path = %expanded.display(),
            "transcript path outside allowed directories, skipping"
        );
        return events;
    }
    if let Ok(meta) = std::fs::metadata(&expanded) {
        if meta.len() > max_size_mb * 1024 * 1024 {
            tracing::warn!(
                path = %expanded.display(),
                bytes = meta.len(),
                limit_mb = max_size_mb,
                "transcript too large, skipping"
            );
            return events;
        }
    }

    let file = match std::fs::File::open(&expanded) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(path = %expanded.display(), error = %err, "cannot open transcript");
            return events;
        }
    };
    for (i, line) in BufReader::new(file).lines().enumerate() {
        if i >= max_events {
            tracing::warn!(limit = max_events, "transcript truncated at event cap");
            break;
        }
        let Ok(line) = line else {
            tracing::warn!(path = %expanded.display(), "read error, keeping partial transcript");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(event) = serde_json::from_str::<Value>(line) {
            events.push(event);
        }
    }
    events
}

/// The branch recorded in a transcript's first event, or empty.
#[must_use]
pub fn git_branch(events: &[Value]) -> String {
    events
        .first()
        .and_then(|event| event.get("gitBranch"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Session-level metadata carried by a transcript's first line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FirstEventMeta {
    /// Branch label at session start, or empty.
    pub branch: String,
    /// Session start time, or empty.
    pub start_ts: String,
}

/// Read only the first line of a transcript for its session metadata.
///
/// Used on session stop, where scanning the whole (potentially large)
/// session transcript would be wasted work. Every failure degrades to
/// empty fields.
#[must_use]
pub fn first_event_meta(path: &str, allowed_roots: &[PathBuf]) -> FirstEventMeta {
    let mut meta = FirstEventMeta::default();
    if path.is_empty() {
        return meta;
    }
    let expanded = expand_tilde(path);
    if !is_safe_path(&expanded, allowed_roots) {
        return meta;
    }
    let Ok(file) = std::fs::File::open(&expanded) else {
        return meta;
    };
    // Cap the read so a single giant line cannot balloon memory; a line
    // cut at the cap fails to parse and degrades like any malformed one.
    let mut reader = BufReader::new(file).take(FIRST_LINE_CAP);
    let mut first_line = String::new();
    if reader.read_line(&mut first_line).is_err() {
        return meta;
    }
    let line = first_line.trim();
    if line.is_empty() {
        return meta;
    }
    let Ok(event) = serde_json::from_str::<Value>(line) else {
        return meta;
    };
    meta.branch = string_field(&event, "gitBranch");
    meta.start_ts = string_field(&event, "sessionStartTimestamp");
    if meta.start_ts.is_empty() {
        meta.start_ts = string_field(&event, "timestamp");
    }
    meta
}

fn string_field(event: &Value, key: &str) -> String {
    event
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
