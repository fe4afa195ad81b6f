//! Markdown rendering and placement of per-invocation agent logs.
//!
//! One log file per subagent invocation, partitioned by date and branch
//! under the agent-log base directory. All transcript-derived text is
//! redacted before it reaches the document, and fenced content is
//! escaped so a hostile tool result cannot break out of its block.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;
use uuid::Uuid;

use agentlog_core::paths;
use agentlog_core::redact::redact;
use agentlog_core::sanitize::{sanitize_branch, sanitize_filename};
use agentlog_core::text::truncate_str;
use agentlog_core::time::{duration_ms, hhmmss};
use agentlog_core::Limits;
use agentlog_store::CacheEntry;
use agentlog_transcript::ExecutionStep;

/// Section heading the summary generator greps for, shared so the two
/// renderers cannot drift apart.
pub const FINAL_RESULT_HEADING: &str = "## Final Result";

/// Neutralize fenced-block delimiters embedded in untrusted text.
#[must_use]
pub fn escape_code_block(text: &str) -> String {
    text.replace("```", "` ` `")
}

/// Render the Markdown log for one completed invocation.
#[must_use]
pub fn render(
    info: &CacheEntry,
    steps: &[ExecutionStep],
    final_response: &str,
    end_ts: &str,
    transcript_path: &str,
    limits: &Limits,
) -> String {
    let subagent = if info.subagent.is_empty() {
        "Unknown"
    } else {
        &info.subagent
    };
    let model = info
        .model
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or("default");
    let duration = match duration_ms(&info.start_ts, end_ts) {
        Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
        None => "unknown".to_owned(),
    };

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# Agent Log: {subagent}"));
    lines.push(String::new());
    lines.push("## Metadata".to_owned());
    lines.push(String::new());
    lines.push("| Field | Value |".to_owned());
    lines.push("|-------|-------|".to_owned());
    lines.push(format!("| Started | {} |", info.start_ts));
    lines.push(format!("| Subagent | {subagent} |"));
    lines.push(format!("| Model | {model} |"));
    lines.push(format!("| Duration | {duration} |"));
    lines.push(String::new());
    lines.push("---".to_owned());
    lines.push(String::new());

    lines.push("## Task".to_owned());
    lines.push(String::new());
    if !info.description.is_empty() {
        lines.push(format!("**Description**: {}", info.description));
        lines.push(String::new());
    }
    lines.push("```".to_owned());
    lines.push(escape_code_block(&info.prompt));
    lines.push("```".to_owned());
    lines.push(String::new());
    lines.push("---".to_owned());
    lines.push(String::new());

    lines.push("## Execution Steps".to_owned());
    lines.push(String::new());
    let mut index = 0usize;
    for step in steps {
        let ExecutionStep::Tool {
            tool,
            input,
            result,
        } = step
        else {
            continue;
        };
        index += 1;
        lines.push(format!("### {index}. [{tool}]"));
        lines.push(String::new());

        if present(input) {
            lines.push("**Input:**".to_owned());
            lines.push("```json".to_owned());
            let pretty =
                serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
            let masked = redact(&pretty);
            if masked.len() > limits.max_tool_input_len {
                lines.push(format!(
                    "{}\n... (truncated)",
                    truncate_str(&masked, limits.max_tool_input_len)
                ));
            } else {
                lines.push(masked.into_owned());
            }
            lines.push("```".to_owned());
            lines.push(String::new());
        }

        if !result.is_empty() {
            lines.push("**Result:**".to_owned());
            lines.push("```".to_owned());
            let escaped = escape_code_block(&redact(result));
            lines.push(truncate_str(&escaped, limits.max_tool_result_len).to_owned());
            if escaped.len() > limits.max_tool_result_len {
                lines.push("... (truncated)".to_owned());
            }
            lines.push("```".to_owned());
            lines.push(String::new());
        }
    }
    if index == 0 {
        lines.push("(no tool calls)".to_owned());
        lines.push(String::new());
    }

    lines.push("---".to_owned());
    lines.push(String::new());
    lines.push(FINAL_RESULT_HEADING.to_owned());
    lines.push(String::new());
    lines.push(escape_response(final_response));
    lines.push(String::new());
    lines.push("---".to_owned());
    lines.push(String::new());
    lines.push("## References".to_owned());
    lines.push(String::new());
    lines.push(format!("- Transcript: `{transcript_path}`"));
    lines.push(String::new());

    lines.join("\n")
}

/// Write a rendered log under `<root>/<base>/<date>[/<branch>]/`.
///
/// The file name combines the time of day, the sanitized subagent name,
/// and a random suffix so same-second invocations cannot collide.
pub fn write(
    project_root: &Path,
    date: &str,
    subagent: &str,
    content: &str,
    branch: &str,
) -> io::Result<PathBuf> {
    let mut dir = paths::agent_log_dir(project_root).join(date);
    if !branch.is_empty() {
        dir = dir.join(sanitize_branch(branch));
    }
    fs::create_dir_all(&dir)?;

    let unique = Uuid::new_v4().simple().to_string();
    let file = dir.join(format!(
        "{}_{}_{}.md",
        hhmmss(&Local::now()),
        sanitize_filename(subagent),
        &unique[..8],
    ));
    fs::write(&file, content)?;
    Ok(file)
}

/// Log path relative to the agent-log base directory, as recorded in
/// index entries. Falls back to the bare file name when the log landed
/// somewhere unexpected.
#[must_use]
pub fn relative_log_path(project_root: &Path, log_file: &Path) -> String {
    let base = paths::agent_log_dir(project_root);
    match log_file.strip_prefix(&base) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => log_file
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned()),
    }
}

/// Redact the final response and defuse Markdown structure inside it:
/// a `---` at a line start would render as a horizontal rule and make
/// the section boundary ambiguous for the summary extractor.
fn escape_response(response: &str) -> String {
    if response.is_empty() {
        return String::new();
    }
    let masked = redact(response);
    let mut guarded = masked.replace("\n---", "\n\\---");
    if let Some(rest) = guarded.strip_prefix("---") {
        guarded = format!("\\---{rest}");
    }
    escape_code_block(&guarded)
}

fn present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
