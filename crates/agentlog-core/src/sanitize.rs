//! Sanitization of untrusted names used in log paths.
//!
//! Subagent types and git branch names come straight out of transcript
//! JSON and end up as file and directory names. Both sanitizers reduce
//! them to `[a-zA-Z0-9_-]`, cap them at 50 bytes, and fall back to
//! `"unknown"` when nothing survives, so a hostile name can never escape
//! the log tree or create a hidden file.

use std::sync::LazyLock;

use regex::Regex;

use crate::text::truncate_str;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]").unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());
static SEPARATOR_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_]+").unwrap());

/// Reduce an arbitrary string to a safe file-name fragment.
///
/// Disallowed characters become `_`, runs of `_` collapse to one, and the
/// result is capped at 50 bytes. Empty input yields `"unknown"`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced = DISALLOWED.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let capped = truncate_str(&collapsed, 50);
    if capped.is_empty() {
        "unknown".to_owned()
    } else {
        capped.to_owned()
    }
}

/// Reduce a git branch name to a safe directory-name fragment.
///
/// `/` separators become `-` so `feature/x` reads as `feature-x`, other
/// disallowed characters become `_`, mixed runs of `-` and `_` collapse to
/// a single `-`, and edge hyphens are trimmed. Capped at 50 bytes; empty
/// input or an all-symbol name yields `"unknown"`.
#[must_use]
pub fn sanitize_branch(branch: &str) -> String {
    if branch.is_empty() {
        return "unknown".to_owned();
    }
    let dashed = branch.replace('/', "-");
    let replaced = DISALLOWED.replace_all(&dashed, "_");
    let collapsed = SEPARATOR_RUNS.replace_all(&replaced, "-");
    let trimmed = collapsed.trim_matches('-');
    let capped = truncate_str(trimmed, 50);
    if capped.is_empty() {
        "unknown".to_owned()
    } else {
        capped.to_owned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
