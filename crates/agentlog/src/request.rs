//! Request payloads handed from the hook to its detached workers.
//!
//! Serialized by the hook, decoded by `analyze` / `summarize` in a
//! separate process. Defaults are applied on the worker side so a
//! hand-fed request (debugging a worker directly) can omit fields.

use serde::{Deserialize, Serialize};

use agentlog_core::time::now_iso;
use agentlog_store::CacheEntry;

use crate::event::default_unknown;

/// Input to the `analyze` worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    /// Session the invocation belonged to.
    #[serde(default = "default_unknown")]
    pub session_id: String,
    /// Path of the subagent's transcript.
    pub transcript_path: String,
    /// Launch parameters captured at invocation start.
    pub session_info: CacheEntry,
    /// Project root the log tree lives under.
    #[serde(default = "default_project_root")]
    pub project_root: String,
    /// Invocation end timestamp; defaults to now when omitted.
    #[serde(default = "now_iso")]
    pub end_ts: String,
}

/// Input to the `summarize` worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeRequest {
    /// Session to summarize.
    #[serde(default = "default_unknown")]
    pub session_id: String,
    /// Project root the log tree lives under.
    #[serde(default = "default_project_root")]
    pub project_root: String,
    /// Session start timestamp from the transcript's first event.
    pub start_ts: String,
    /// Session end timestamp; defaults to now when omitted.
    #[serde(default = "now_iso")]
    pub end_ts: String,
    /// Branch label from the transcript's first event.
    pub branch: String,
}

fn default_project_root() -> String {
    ".".to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
