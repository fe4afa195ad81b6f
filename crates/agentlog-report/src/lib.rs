//! # agentlog-report
//!
//! Markdown generation for the task-logging pipeline:
//!
//! - **Agent logs**: one redacted, fence-escaped document per subagent
//!   invocation, partitioned by date and branch.
//! - **Session summaries**: an overview of a session's prompts and
//!   invocations, quoting each log's final-result section.
//!
//! Renderers are pure (`&[...] -> String`); file placement lives in the
//! sibling `write` functions so tests can cover layout separately.

#![deny(unsafe_code)]

pub mod agent_log;
pub mod summary;
