//! The `analyze` worker: turn one finished invocation into a Markdown
//! log and an index entry.
//!
//! Runs detached from the hook that spawned it. Everything after request
//! validation degrades to exit 0, because by this point a failure can
//! only lose one log, and the session that triggered us is already gone.

use std::path::Path;

use agentlog_core::time::{duration_ms, today};
use agentlog_core::Limits;
use agentlog_report::agent_log;
use agentlog_store::{EventIndex, IndexEntry};
use agentlog_transcript::{extract_execution_steps, final_response, git_branch, read_events};

use crate::input;
use crate::request::AnalyzeRequest;

/// Run the worker: read the request, render the log, index it.
pub fn run(input_file: Option<&Path>) -> u8 {
    let request: AnalyzeRequest = match input::read_request(input_file) {
        Ok(request) => request,
        Err(err) => {
            tracing::error!(error = %err, "failed to read analyze request");
            return 1;
        }
    };
    let Some(root) = input::validate_project_root(&request.project_root) else {
        return 1;
    };
    execute(&request, &root)
}

fn execute(request: &AnalyzeRequest, root: &Path) -> u8 {
    let limits = Limits::from_env();
    let allowed = input::allowed_roots(root);

    let events = read_events(
        &request.transcript_path,
        &allowed,
        limits.max_file_size_mb,
        limits.max_events,
    );
    if events.is_empty() {
        tracing::warn!(
            path = %request.transcript_path,
            "empty or unreadable transcript, skipping log generation"
        );
        return 0;
    }

    let branch = git_branch(&events);
    let steps = extract_execution_steps(&events, &limits);
    let response = final_response(&steps);

    let info = &request.session_info;
    let content = agent_log::render(
        info,
        &steps,
        response,
        &request.end_ts,
        &request.transcript_path,
        &limits,
    );

    let date = if info.date.is_empty() {
        today()
    } else {
        info.date.clone()
    };
    let subagent = if info.subagent.is_empty() {
        "unknown"
    } else {
        &info.subagent
    };

    let log_path = match agent_log::write(root, &date, subagent, &content, &branch) {
        Ok(path) => path,
        Err(err) => {
            tracing::error!(error = %err, "failed to write agent log, skipping index entry");
            return 0;
        }
    };
    tracing::info!(path = %log_path.display(), "agent log written");

    let entry = IndexEntry {
        date,
        session: request.session_id.clone(),
        subagent: subagent.to_owned(),
        branch: if branch.is_empty() {
            "unknown".to_owned()
        } else {
            branch
        },
        start: info.start_ts.clone(),
        end: request.end_ts.clone(),
        duration_ms: duration_ms(&info.start_ts, &request.end_ts),
        status: "success".to_owned(),
        log_file: agent_log::relative_log_path(root, &log_path),
    };
    if let Err(err) = EventIndex::new(root).append(&entry) {
        tracing::warn!(error = %err, "failed to append index entry");
    }
    0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
