//! Reconstruction of ordered execution steps from transcript events.
//!
//! A subagent transcript interleaves free-text responses with tool calls
//! whose results arrive in later events, correlated by id. The extractor
//! buffers tool invocations until their result shows up, then emits one
//! combined step, preserving transcript order of completion.
//!
//! Three historical event shapes are recognized: the current nested form
//! (`assistant` / `user` messages carrying content lists) and two legacy
//! flat forms (`tool_use` / `tool_result` as top-level event types).

use std::collections::HashMap;

use serde_json::Value;

use agentlog_core::text::truncate_str;
use agentlog_core::Limits;

/// Sentinel returned when a transcript ends without a text response.
pub const NO_RESPONSE: &str = "(no response)";

/// One step of a subagent's execution, in transcript order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStep {
    /// A free-text assistant response.
    Response {
        /// The response text.
        content: String,
    },
    /// A tool invocation paired with its result.
    Tool {
        /// Tool name, `"Unknown"` when the invocation was never seen.
        tool: String,
        /// Input parameters as recorded in the transcript.
        input: Value,
        /// Result text, capped at the content limit.
        result: String,
    },
}

/// Extract ordered execution steps from parsed transcript events.
pub fn extract_execution_steps(events: &[Value], limits: &Limits) -> Vec<ExecutionStep> {
    let mut steps = Vec::new();
    // tool_use id -> (name, input), awaiting the matching result
    let mut pending: HashMap<String, (String, Value)> = HashMap::new();

    for event in events {
        match event.get("type").and_then(Value::as_str) {
            Some("assistant") => {
                for item in message_content(event) {
                    match item.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            if let Some(text) = item.get("text").and_then(Value::as_str) {
                                if !text.is_empty() {
                                    steps.push(ExecutionStep::Response {
                                        content: text.to_owned(),
                                    });
                                }
                            }
                        }
                        Some("tool_use") => {
                            let id = item.get("id").and_then(Value::as_str).unwrap_or_default();
                            if !id.is_empty() {
                                let name = item
                                    .get("name")
                                    .and_then(Value::as_str)
                                    .unwrap_or("Unknown");
                                let input =
                                    item.get("input").cloned().unwrap_or_else(empty_object);
                                let _ =
                                    pending.insert(id.to_owned(), (name.to_owned(), input));
                            }
                        }
                        _ => {}
                    }
                }
            }
            Some("user") => {
                for item in message_content(event) {
                    if item.get("type").and_then(Value::as_str) == Some("tool_result") {
                        let id = item
                            .get("tool_use_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        let result = result_text(item.get("content"));
                        steps.push(tool_step(&pending, id, result, limits));
                    }
                }
            }
            // Legacy flat form: the result is its own event.
            Some("tool_result") => {
                let id = first_string(event, &["toolUseId", "tool_id", "tool_use_id"]);
                let raw = match event.get("content") {
                    Some(v) if !value_is_empty(v) => Some(v),
                    _ => event.get("result"),
                };
                let result = result_text(raw);
                steps.push(tool_step(&pending, id, result, limits));
            }
            // Legacy flat form: the invocation is its own event.
            Some("tool_use") => {
                let id = first_string(event, &["id", "tool_use_id"]);
                if !id.is_empty() {
                    let name = match first_string(event, &["tool", "name"]) {
                        "" => "Unknown",
                        name => name,
                    };
                    let input = match event.get("input") {
                        Some(v) if !value_is_empty(v) => v.clone(),
                        _ => event.get("tool_input").cloned().unwrap_or_else(empty_object),
                    };
                    let _ = pending.insert(id.to_owned(), (name.to_owned(), input));
                }
            }
            _ => {}
        }
    }
    steps
}

/// The last response step's text, scanning backwards.
///
/// A subagent usually closes with a summary, but one that ends on a tool
/// call yields the [`NO_RESPONSE`] sentinel instead.
#[must_use]
pub fn final_response(steps: &[ExecutionStep]) -> &str {
    for step in steps.iter().rev() {
        if let ExecutionStep::Response { content } = step {
            return content;
        }
    }
    NO_RESPONSE
}

/// The content list of a nested assistant/user message, or empty.
pub(crate) fn message_content(event: &Value) -> impl Iterator<Item = &Value> {
    event
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
}

fn tool_step(
    pending: &HashMap<String, (String, Value)>,
    id: &str,
    result: String,
    limits: &Limits,
) -> ExecutionStep {
    let (tool, input) = pending
        .get(id)
        .cloned()
        .unwrap_or_else(|| ("Unknown".to_owned(), empty_object()));
    let result = if result.len() > limits.max_content_len {
        format!("{}...", truncate_str(&result, limits.max_content_len))
    } else {
        result
    };
    ExecutionStep::Tool {
        tool,
        input,
        result,
    }
}

/// Flatten a tool-result value to text.
///
/// List results (mixed text/image content) keep only the textual parts,
/// joined with newlines; non-string scalars fall back to their JSON form.
fn result_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let mut parts = Vec::new();
            for item in items {
                match item {
                    Value::String(s) => parts.push(s.clone()),
                    Value::Object(_) => {
                        if item.get("type").and_then(Value::as_str) == Some("text") {
                            parts.push(
                                item.get("text")
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_owned(),
                            );
                        }
                    }
                    _ => {}
                }
            }
            parts.join("\n")
        }
        Some(other) => other.to_string(),
    }
}

/// First present, non-empty string among `keys`, or empty.
fn first_string<'a>(event: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .filter_map(|key| event.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn assistant_tool_use(id: &str, name: &str, input: Value) -> Value {
        json!({
            "type": "assistant",
            "message": {"content": [{"type": "tool_use", "id": id, "name": name, "input": input}]}
        })
    }

    fn user_tool_result(id: &str, content: Value) -> Value {
        json!({
            "type": "user",
            "message": {"content": [{"type": "tool_result", "tool_use_id": id, "content": content}]}
        })
    }

    fn assistant_text(text: &str) -> Value {
        json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": text}]}
        })
    }

    // ── modern nested form ──────────────────────────────────────────

    #[test]
    fn pairs_tool_use_with_result() {
        let events = vec![
            assistant_tool_use("toolu_01", "Read", json!({"file_path": "/tmp/a"})),
            user_tool_result("toolu_01", json!("file contents")),
        ];
        let steps = extract_execution_steps(&events, &Limits::default());
        assert_eq!(
            steps,
            vec![ExecutionStep::Tool {
                tool: "Read".into(),
                input: json!({"file_path": "/tmp/a"}),
                result: "file contents".into(),
            }]
        );
    }

    #[test]
    fn text_fragments_become_responses_in_order() {
        let events = vec![
            assistant_text("thinking about it"),
            assistant_tool_use("toolu_01", "Bash", json!({"command": "ls"})),
            user_tool_result("toolu_01", json!("a b c")),
            assistant_text("done"),
        ];
        let steps = extract_execution_steps(&events, &Limits::default());
        assert_eq!(steps.len(), 3);
        assert!(matches!(&steps[0], ExecutionStep::Response { content } if content == "thinking about it"));
        assert!(matches!(&steps[1], ExecutionStep::Tool { tool, .. } if tool == "Bash"));
        assert!(matches!(&steps[2], ExecutionStep::Response { content } if content == "done"));
    }

    #[test]
    fn empty_text_fragments_skipped() {
        let steps = extract_execution_steps(&[assistant_text("")], &Limits::default());
        assert!(steps.is_empty());
    }

    #[test]
    fn list_result_keeps_only_text_parts() {
        let events = vec![
            assistant_tool_use("toolu_01", "Read", json!({})),
            user_tool_result(
                "toolu_01",
                json!([
                    {"type": "text", "text": "first"},
                    {"type": "image", "source": {"data": "…"}},
                    "plain",
                    {"type": "text", "text": "second"},
                ]),
            ),
        ];
        let steps = extract_execution_steps(&events, &Limits::default());
        let ExecutionStep::Tool { result, .. } = &steps[0] else {
            panic!("expected tool step");
        };
        assert_eq!(result, "first\nplain\nsecond");
    }

    #[test]
    fn unmatched_result_becomes_unknown_tool() {
        let events = vec![user_tool_result("toolu_99", json!("orphan"))];
        let steps = extract_execution_steps(&events, &Limits::default());
        assert_eq!(
            steps,
            vec![ExecutionStep::Tool {
                tool: "Unknown".into(),
                input: json!({}),
                result: "orphan".into(),
            }]
        );
    }

    #[test]
    fn results_pair_in_arrival_order() {
        let events = vec![
            assistant_tool_use("a", "First", json!({})),
            assistant_tool_use("b", "Second", json!({})),
            user_tool_result("b", json!("b done")),
            user_tool_result("a", json!("a done")),
        ];
        let steps = extract_execution_steps(&events, &Limits::default());
        assert!(matches!(&steps[0], ExecutionStep::Tool { tool, .. } if tool == "Second"));
        assert!(matches!(&steps[1], ExecutionStep::Tool { tool, .. } if tool == "First"));
    }

    #[test]
    fn long_result_capped_with_ellipsis() {
        let limits = Limits {
            max_content_len: 10,
            ..Limits::default()
        };
        let events = vec![
            assistant_tool_use("toolu_01", "Bash", json!({})),
            user_tool_result("toolu_01", json!("0123456789abcdef")),
        ];
        let steps = extract_execution_steps(&events, &limits);
        let ExecutionStep::Tool { result, .. } = &steps[0] else {
            panic!("expected tool step");
        };
        assert_eq!(result, "0123456789...");
    }

    // ── legacy flat forms ───────────────────────────────────────────

    #[test]
    fn legacy_flat_pair() {
        let events = vec![
            json!({"type": "tool_use", "id": "t1", "tool": "Grep", "input": {"pattern": "x"}}),
            json!({"type": "tool_result", "toolUseId": "t1", "content": "3 matches"}),
        ];
        let steps = extract_execution_steps(&events, &Limits::default());
        assert_eq!(
            steps,
            vec![ExecutionStep::Tool {
                tool: "Grep".into(),
                input: json!({"pattern": "x"}),
                result: "3 matches".into(),
            }]
        );
    }

    #[test]
    fn legacy_alternate_field_names() {
        let events = vec![
            json!({"type": "tool_use", "tool_use_id": "t1", "name": "Write", "tool_input": {"path": "f"}}),
            json!({"type": "tool_result", "tool_id": "t1", "result": "written"}),
        ];
        let steps = extract_execution_steps(&events, &Limits::default());
        assert_eq!(
            steps,
            vec![ExecutionStep::Tool {
                tool: "Write".into(),
                input: json!({"path": "f"}),
                result: "written".into(),
            }]
        );
    }

    #[test]
    fn unknown_event_types_ignored() {
        let events = vec![
            json!({"type": "system", "message": "boot"}),
            json!({"no_type_at_all": true}),
        ];
        assert!(extract_execution_steps(&events, &Limits::default()).is_empty());
    }

    // ── final_response ──────────────────────────────────────────────

    #[test]
    fn final_response_takes_last_text() {
        let steps = vec![
            ExecutionStep::Response {
                content: "first".into(),
            },
            ExecutionStep::Tool {
                tool: "Bash".into(),
                input: json!({}),
                result: String::new(),
            },
            ExecutionStep::Response {
                content: "closing summary".into(),
            },
        ];
        assert_eq!(final_response(&steps), "closing summary");
    }

    #[test]
    fn trailing_tool_step_yields_sentinel() {
        let events = vec![
            assistant_tool_use("toolu_01", "Bash", json!({})),
            user_tool_result("toolu_01", json!("output")),
        ];
        let steps = extract_execution_steps(&events, &Limits::default());
        assert_eq!(final_response(&steps), NO_RESPONSE);
    }

    #[test]
    fn empty_steps_yield_sentinel() {
        assert_eq!(final_response(&[]), NO_RESPONSE);
    }
}
