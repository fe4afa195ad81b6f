//! The `summarize` worker: render one session's summary from the
//! invocation index and the prompt journal.

use std::path::Path;

use agentlog_report::summary;
use agentlog_store::{EventIndex, PromptLog, RetryPolicy};

use crate::input;
use crate::request::SummarizeRequest;

/// Run the worker: read the request, collect the session, write the
/// summary.
pub fn run(input_file: Option<&Path>) -> u8 {
    let request: SummarizeRequest = match input::read_request(input_file) {
        Ok(request) => request,
        Err(err) => {
            tracing::error!(error = %err, "failed to read summarize request");
            return 1;
        }
    };
    let Some(root) = input::validate_project_root(&request.project_root) else {
        return 1;
    };
    execute(&request, &root)
}

fn execute(request: &SummarizeRequest, root: &Path) -> u8 {
    let entries =
        EventIndex::new(root).read_session(&request.session_id, &RetryPolicy::default());
    if entries.is_empty() {
        tracing::info!(
            session = %request.session_id,
            "no subagent invocations in session, skipping summary"
        );
        return 0;
    }
    let prompts = PromptLog::new(root).read_session(&request.session_id);

    let content = summary::render(
        &request.session_id,
        &entries,
        &prompts,
        root,
        &request.start_ts,
        &request.end_ts,
    );
    match summary::write(root, &request.session_id, &content, &request.branch) {
        Ok(path) => tracing::info!(path = %path.display(), "session summary written"),
        Err(err) => tracing::error!(error = %err, "failed to write session summary"),
    }
    0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
