//! Lifecycle event handlers for the `hook` subcommand.
//!
//! Every handler follows the same degradation policy: problems with the
//! logging machinery are warned about and swallowed (exit 0) so the
//! session never fails because its logger did; only malformed input and
//! a worker that cannot be started are reported as failures (exit 1).

use std::io::Read;
use std::path::PathBuf;

use serde_json::Value;

use agentlog_core::text::truncate_str;
use agentlog_core::time::{now_iso, today};
use agentlog_core::{paths, Limits};
use agentlog_store::{CacheEntry, CorrelationCache, PromptEntry, PromptLog};
use agentlog_transcript::{find_task_invocation, first_event_meta};

use crate::event::{self, HookEvent, InvocationStart, InvocationStop, PromptSubmitted, SessionStop};
use crate::input::allowed_roots;
use crate::request::{AnalyzeRequest, SummarizeRequest};
use crate::spawn::spawn_detached;

/// Entry point for `agentlog hook`: read one event from stdin and
/// dispatch it.
pub fn run() -> u8 {
    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        tracing::error!(error = %err, "failed to read hook input");
        return 1;
    }
    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "invalid JSON on hook stdin");
            return 1;
        }
    };
    let Some(hook_event) = event::parse(&value) else {
        tracing::debug!("ignoring unrecognized hook event");
        return 0;
    };
    HookContext::from_env().dispatch(hook_event)
}

/// Resolved environment a hook invocation runs against.
pub struct HookContext {
    root: PathBuf,
    /// Correlation-cache directory override; `None` uses the
    /// user-private default.
    cache_dir: Option<PathBuf>,
    limits: Limits,
}

impl HookContext {
    /// Context from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            root: paths::project_root(),
            cache_dir: None,
            limits: Limits::from_env(),
        }
    }

    /// Route one decoded event to its handler.
    pub fn dispatch(&self, hook_event: HookEvent) -> u8 {
        match hook_event {
            HookEvent::InvocationStart(start) => self.on_invocation_start(&start),
            HookEvent::PromptSubmitted(prompt) => self.on_prompt_submitted(&prompt),
            HookEvent::InvocationStop(stop) => self.on_invocation_stop(&stop),
            HookEvent::SessionStop(stop) => self.on_session_stop(&stop),
        }
    }

    /// Record launch parameters of a `Task` invocation so the stop
    /// handler can recover its start time.
    fn on_invocation_start(&self, start: &InvocationStart) -> u8 {
        if start.tool_name != "Task" {
            return 0;
        }
        let Some(cache) = self.open_cache() else {
            return 0;
        };
        let mut entries = cache.load();
        let key = CorrelationCache::key(&start.session_id, &start.tool_use_id);
        let _ = entries.insert(
            key,
            CacheEntry {
                start_ts: now_iso(),
                subagent: start.tool_input.subagent_type.clone(),
                date: today(),
                description: start.tool_input.description.clone(),
                prompt: truncate_str(&start.tool_input.prompt, self.limits.max_prompt_len)
                    .to_owned(),
                model: start.tool_input.model.clone(),
                cwd: start.cwd.clone(),
            },
        );
        if let Err(err) = cache.save(&entries) {
            tracing::warn!(error = %err, "failed to save correlation cache");
        }
        0
    }

    /// Append the submitted prompt to the session's journal.
    fn on_prompt_submitted(&self, prompt: &PromptSubmitted) -> u8 {
        if prompt.prompt.is_empty() {
            return 0;
        }
        let entry = PromptEntry {
            timestamp: now_iso(),
            session_id: prompt.session_id.clone(),
            prompt: truncate_str(&prompt.prompt, self.limits.max_prompt_len * 2).to_owned(),
            date: today(),
        };
        if let Err(err) = PromptLog::new(&self.root).append(&entry) {
            tracing::warn!(error = %err, "failed to record user prompt");
        }
        0
    }

    /// Correlate a finished invocation with its `Task` launch and hand
    /// the merged record to a detached `analyze` worker.
    fn on_invocation_stop(&self, stop: &InvocationStop) -> u8 {
        if stop.transcript_path.is_empty() || stop.agent_transcript_path.is_empty() {
            return 0;
        }
        let allowed = allowed_roots(&self.root);
        let Some((details, tool_use_id)) = find_task_invocation(
            &stop.transcript_path,
            &stop.agent_id,
            &allowed,
            &self.limits,
        ) else {
            return 0;
        };

        let mut start_ts = now_iso();
        if let Some(cache) = self.open_cache() {
            let key = CorrelationCache::key(&stop.session_id, &tool_use_id);
            if let Some(cached) = cache.load().get(&key) {
                start_ts.clone_from(&cached.start_ts);
            }
        }

        let request = AnalyzeRequest {
            session_id: stop.session_id.clone(),
            transcript_path: stop.agent_transcript_path.clone(),
            session_info: CacheEntry {
                start_ts,
                subagent: details.subagent,
                date: today(),
                description: details.description,
                prompt: details.prompt,
                model: details.model,
                cwd: stop.cwd.clone(),
            },
            project_root: self.root.to_string_lossy().into_owned(),
            end_ts: now_iso(),
        };
        spawn_worker("analyze", &request)
    }

    /// Hand the finished session to a detached `summarize` worker.
    fn on_session_stop(&self, stop: &SessionStop) -> u8 {
        if stop.stop_hook_active {
            return 0;
        }
        let meta = first_event_meta(&stop.transcript_path, &allowed_roots(&self.root));
        let request = SummarizeRequest {
            session_id: stop.session_id.clone(),
            project_root: self.root.to_string_lossy().into_owned(),
            start_ts: meta.start_ts,
            end_ts: now_iso(),
            branch: meta.branch,
        };
        spawn_worker("summarize", &request)
    }

    fn open_cache(&self) -> Option<CorrelationCache> {
        match &self.cache_dir {
            Some(dir) => Some(CorrelationCache::new(dir, self.limits.cache_ttl)),
            None => match CorrelationCache::open_default(&self.limits) {
                Ok(cache) => Some(cache),
                Err(err) => {
                    tracing::warn!(error = %err, "cache directory unavailable");
                    None
                }
            },
        }
    }
}

fn spawn_worker<T: serde::Serialize>(subcommand: &str, request: &T) -> u8 {
    let payload = match serde_json::to_string(request) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode worker request");
            return 1;
        }
    };
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(err) => {
            tracing::error!(error = %err, "failed to resolve current executable");
            return 1;
        }
    };
    if let Err(err) = spawn_detached(&exe, subcommand, &payload) {
        tracing::error!(error = %err, "failed to start worker");
        return 1;
    }
    0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
