//! Recovery of subagent launch parameters from the parent transcript.
//!
//! A stop event only carries the subagent's own transcript path and an
//! agent id. The subagent type, task description, and prompt live in the
//! parent session's transcript, inside the `Task` tool invocation that
//! launched it. This module re-reads the parent transcript and matches
//! that invocation back to the agent id.

use std::path::PathBuf;

use serde_json::Value;

use agentlog_core::text::truncate_str;
use agentlog_core::Limits;

use crate::parser::read_events;
use crate::steps::message_content;

/// Launch parameters of one `Task` tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetails {
    /// Subagent type, `"unknown"` when absent.
    pub subagent: String,
    /// Short task description.
    pub description: String,
    /// Task prompt, truncated to the configured limit.
    pub prompt: String,
    /// Model override, when one was requested.
    pub model: Option<String>,
}

/// Find the `Task` invocation that launched `agent_id`.
///
/// Matches by tool_use id appearing as a substring of the agent id.
/// When no id matches, the latest invocation is used on the assumption
/// that stops arrive in launch order. Returns the details together with
/// the matched tool_use id, or `None` when the parent transcript holds
/// no `Task` invocations at all.
pub fn find_task_invocation(
    transcript_path: &str,
    agent_id: &str,
    allowed_roots: &[PathBuf],
    limits: &Limits,
) -> Option<(TaskDetails, String)> {
    let events = read_events(
        transcript_path,
        allowed_roots,
        limits.max_parent_size_mb,
        limits.max_parent_events,
    );

    let mut found: Vec<(TaskDetails, String)> = Vec::new();
    for event in &events {
        if event.get("type").and_then(Value::as_str) != Some("assistant") {
            continue;
        }
        for item in message_content(event) {
            if item.get("type").and_then(Value::as_str) != Some("tool_use")
                || item.get("name").and_then(Value::as_str) != Some("Task")
            {
                continue;
            }
            let Some(input) = item.get("input").and_then(Value::as_object) else {
                continue;
            };
            // Only Task calls that actually launch a subagent.
            if !input.contains_key("subagent_type") {
                continue;
            }
            let id = item
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let details = TaskDetails {
                subagent: str_or(input.get("subagent_type"), "unknown"),
                description: str_or(input.get("description"), ""),
                prompt: truncate_str(
                    input.get("prompt").and_then(Value::as_str).unwrap_or_default(),
                    limits.max_prompt_len,
                )
                .to_owned(),
                model: input.get("model").and_then(Value::as_str).map(str::to_owned),
            };
            found.push((details, id));
        }
    }

    if let Some(matched) = found
        .iter()
        .find(|(_, id)| !id.is_empty() && !agent_id.is_empty() && agent_id.contains(id.as_str()))
    {
        return Some(matched.clone());
    }
    if !found.is_empty() {
        tracing::warn!(
            agent_id = %agent_id,
            "no matching tool_use id, using latest task invocation"
        );
    }
    found.pop()
}

fn str_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
