//! # agentlog-core
//!
//! Foundation utilities for the agentlog hook system.
//!
//! This crate provides the shared vocabulary the other agentlog crates
//! depend on:
//!
//! - **Limits**: every tunable cap in one struct, with validated env overrides
//! - **Redaction**: ordered credential-scrubbing rules applied before any
//!   content is persisted or rendered
//! - **Sanitization**: filesystem-safe subagent and branch names
//! - **Paths**: the host log layout, the user-private cache directory, and
//!   the allow-list path check
//! - **Text**: UTF-8-boundary-safe truncation backing every byte cap
//! - **Time**: RFC 3339 local timestamps with tolerant parsing

#![deny(unsafe_code)]

pub mod limits;
pub mod paths;
pub mod redact;
pub mod sanitize;
pub mod text;
pub mod time;

pub use limits::Limits;
