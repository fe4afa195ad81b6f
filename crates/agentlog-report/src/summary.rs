//! Markdown rendering of end-of-session summaries.
//!
//! A summary stitches together the session's index entries and prompt
//! journal, quoting the final-result section of each agent log. Entries
//! are ordered by their recorded start time, not by index file order,
//! since concurrent invocations append in completion order.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;

use agentlog_core::paths;
use agentlog_core::redact::redact;
use agentlog_core::sanitize::sanitize_branch;
use agentlog_core::text::{truncate_str, truncate_with_suffix};
use agentlog_core::time::{clock_time, hhmmss, now_iso, today};
use agentlog_store::{IndexEntry, PromptEntry};

use crate::agent_log::FINAL_RESULT_HEADING;

/// Byte cap on a quoted final-result excerpt.
const RESULT_EXCERPT_LEN: usize = 500;
/// Byte cap on a quoted user prompt.
const PROMPT_PREVIEW_LEN: usize = 200;
/// Max quoted lines per final-result excerpt.
const RESULT_EXCERPT_LINES: usize = 5;

/// Start of the section following a final result: another heading or a
/// horizontal rule on its own line.
static SECTION_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(## |---\n)").unwrap());

/// Pull the final-result section out of a written agent log.
///
/// The log path is re-validated against the project root before the
/// read; an index entry pointing outside it yields nothing. The excerpt
/// is redacted again in case the log predates a redaction rule.
pub fn extract_final_result(project_root: &Path, log_file: &str) -> Option<String> {
    let log_path = paths::agent_log_dir(project_root).join(log_file);
    if !log_path.exists() {
        tracing::debug!(log_file = %log_file, "indexed log missing, skipping excerpt");
        return None;
    }
    if !paths::is_safe_path(&log_path, &[project_root.to_path_buf()]) {
        tracing::warn!(
            log_file = %log_file,
            "index entry resolves outside the project root, skipping excerpt"
        );
        return None;
    }
    let content = match fs::read_to_string(&log_path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(log_file = %log_file, error = %err, "failed to read indexed log");
            return None;
        }
    };
    let (_, section) = content.split_once(FINAL_RESULT_HEADING)?;
    let section = match SECTION_BOUNDARY.find(section) {
        Some(boundary) => &section[..boundary.start()],
        None => section,
    };
    let result = redact(section.trim());
    let result = truncate_with_suffix(&result, RESULT_EXCERPT_LEN, "...");
    (!result.is_empty()).then_some(result)
}

/// Render the Markdown summary for one session.
#[must_use]
pub fn render(
    session_id: &str,
    entries: &[IndexEntry],
    prompts: &[PromptEntry],
    project_root: &Path,
    start_ts: &str,
    end_ts: &str,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# Session Summary: {}", today()));
    lines.push(String::new());

    lines.push("## Overview".to_owned());
    lines.push(String::new());
    lines.push("| Field | Value |".to_owned());
    lines.push("|-------|-------|".to_owned());
    lines.push(format!("| Session | `{}...` |", truncate_str(session_id, 16)));
    lines.push(format!("| Started | {start_ts} |"));
    lines.push(format!("| Ended | {end_ts} |"));
    lines.push(format!("| Invocations | {} |", entries.len()));
    lines.push(format!("| User prompts | {} |", prompts.len()));
    let total_ms: i64 = entries.iter().filter_map(|e| e.duration_ms).sum();
    if total_ms > 0 {
        lines.push(format!(
            "| Total subagent time | {:.1}s |",
            total_ms as f64 / 1000.0
        ));
    }
    let branches: BTreeSet<&str> = entries.iter().map(|e| e.branch.as_str()).collect();
    if !branches.is_empty() {
        lines.push(format!(
            "| Branches | {} |",
            branches.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }
    lines.push(String::new());
    lines.push("---".to_owned());
    lines.push(String::new());

    if !prompts.is_empty() {
        lines.push("## User Prompts".to_owned());
        lines.push(String::new());
        for (i, prompt) in prompts.iter().enumerate() {
            lines.push(format!("### {}. [{}]", i + 1, clock_time(&prompt.timestamp)));
            lines.push(String::new());
            lines.push(format!(
                "> {}",
                truncate_str(&prompt.prompt, PROMPT_PREVIEW_LEN)
            ));
            if prompt.prompt.len() > PROMPT_PREVIEW_LEN {
                lines.push("> ...".to_owned());
            }
            lines.push(String::new());
        }
        lines.push("---".to_owned());
        lines.push(String::new());
    }

    lines.push("## Subagent Invocations".to_owned());
    lines.push(String::new());
    if entries.is_empty() {
        lines.push("(no subagent invocations)".to_owned());
        lines.push(String::new());
    } else {
        let mut ordered: Vec<&IndexEntry> = entries.iter().collect();
        ordered.sort_by(|a, b| a.start.cmp(&b.start));

        for (i, entry) in ordered.iter().enumerate() {
            let duration = entry
                .duration_ms
                .filter(|ms| *ms != 0)
                .map(|ms| format!(" ({:.1}s)", ms as f64 / 1000.0))
                .unwrap_or_default();
            lines.push(format!(
                "### {}. {} [{}]{duration}",
                i + 1,
                entry.subagent,
                clock_time(&entry.start),
            ));
            lines.push(String::new());

            if !entry.log_file.is_empty() {
                lines.push(format!(
                    "**Log**: `{}/{}`",
                    paths::LOG_BASE_DIR,
                    entry.log_file
                ));
                lines.push(String::new());

                if let Some(result) = extract_final_result(project_root, &entry.log_file) {
                    let result_lines: Vec<&str> = result.split('\n').collect();
                    for line in result_lines.iter().take(RESULT_EXCERPT_LINES) {
                        lines.push(format!("> {line}"));
                    }
                    if result_lines.len() > RESULT_EXCERPT_LINES {
                        lines.push("> ...".to_owned());
                    }
                    lines.push(String::new());
                }
            }
        }
    }

    lines.push("---".to_owned());
    lines.push(String::new());
    lines.push(format!("*Generated at {}*", now_iso()));
    lines.push(String::new());

    lines.join("\n")
}

/// Write a rendered summary under `<root>/<base>/<date>[/<branch>]/`.
///
/// The file name combines the time of day with the first 16 chars of
/// the session id.
pub fn write(
    project_root: &Path,
    session_id: &str,
    content: &str,
    branch: &str,
) -> io::Result<PathBuf> {
    let mut dir = paths::session_summary_dir(project_root).join(today());
    if !branch.is_empty() {
        dir = dir.join(sanitize_branch(branch));
    }
    fs::create_dir_all(&dir)?;

    let file = dir.join(format!(
        "{}_{}.md",
        hhmmss(&Local::now()),
        truncate_str(session_id, 16)
    ));
    fs::write(&file, content)?;
    Ok(file)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
