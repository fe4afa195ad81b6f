//! # agentlog-transcript
//!
//! Bounded, fault-tolerant extraction from Claude Code transcript files:
//!
//! - **Parser**: allow-listed, size- and count-capped JSONL event reads.
//! - **Steps**: reconstruction of ordered execution steps (responses and
//!   tool calls paired with their results) across three event schemas.
//! - **Task info**: recovery of subagent launch parameters from the
//!   parent session's transcript.
//!
//! Every failure path degrades to an empty result with a logged warning;
//! nothing in this crate propagates errors to the hook caller.

#![deny(unsafe_code)]

pub mod parser;
pub mod steps;
pub mod task_info;

pub use parser::{first_event_meta, git_branch, read_events, FirstEventMeta};
pub use steps::{extract_execution_steps, final_response, ExecutionStep, NO_RESPONSE};
pub use task_info::{find_task_invocation, TaskDetails};
