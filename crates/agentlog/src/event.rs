//! Decoding of lifecycle hook events.
//!
//! The hook receives one JSON object on stdin with an `event`
//! discriminator. Unknown kinds and undecodable payloads are not
//! errors: the hook must never fail the session over an event it does
//! not understand, so [`parse`] returns `None` and the caller exits 0.

use serde::Deserialize;
use serde_json::Value;

/// One lifecycle event, discriminated by the `event` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HookEvent {
    /// A tool invocation is about to run.
    InvocationStart(InvocationStart),
    /// The user submitted a prompt.
    PromptSubmitted(PromptSubmitted),
    /// A subagent invocation finished.
    InvocationStop(InvocationStop),
    /// The session ended.
    SessionStop(SessionStop),
}

/// Payload of an `invocation-start` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvocationStart {
    /// Session the invocation belongs to.
    #[serde(default = "default_unknown")]
    pub session_id: String,
    /// Name of the tool being invoked; only `"Task"` is recorded.
    pub tool_name: String,
    /// Correlation id of this tool invocation.
    pub tool_use_id: String,
    /// The `Task` tool's input parameters.
    pub tool_input: TaskInput,
    /// Working directory of the session.
    pub cwd: String,
}

/// `tool_input` of a `Task` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskInput {
    /// Subagent type being launched.
    #[serde(default = "default_unknown")]
    pub subagent_type: String,
    /// Short task description.
    pub description: String,
    /// Task prompt.
    pub prompt: String,
    /// Model override, when requested.
    pub model: Option<String>,
}

impl Default for TaskInput {
    fn default() -> Self {
        Self {
            subagent_type: default_unknown(),
            description: String::new(),
            prompt: String::new(),
            model: None,
        }
    }
}

/// Payload of a `prompt-submitted` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromptSubmitted {
    /// Session the prompt belongs to.
    #[serde(default = "default_unknown")]
    pub session_id: String,
    /// The submitted prompt text.
    pub prompt: String,
}

/// Payload of an `invocation-stop` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvocationStop {
    /// Session the invocation belonged to.
    #[serde(default = "default_unknown")]
    pub session_id: String,
    /// Path of the parent session's transcript.
    pub transcript_path: String,
    /// Id of the finished subagent.
    pub agent_id: String,
    /// Path of the subagent's own transcript.
    pub agent_transcript_path: String,
    /// Working directory of the session.
    pub cwd: String,
}

/// Payload of a `session-stop` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionStop {
    /// The session that ended.
    #[serde(default = "default_unknown")]
    pub session_id: String,
    /// Path of the session's transcript.
    pub transcript_path: String,
    /// Set when this stop was itself triggered by a stop hook.
    pub stop_hook_active: bool,
}

/// Decode a hook event, or `None` when the kind is unrecognized or the
/// payload does not decode.
pub fn parse(input: &Value) -> Option<HookEvent> {
    serde_json::from_value(input.clone()).ok()
}

pub(crate) fn default_unknown() -> String {
    "unknown".to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
