//! Tunable limits for transcript parsing, caching, and locking.
//!
//! Every cap the system enforces lives here so the policy is auditable in
//! one place. [`Limits::from_env`] starts from the defaults and applies the
//! `AGENTLOG_*` environment overrides; invalid values are logged and
//! ignored rather than propagated, since a bad override must never break
//! the host's hook pipeline.

use std::time::Duration;

/// Caps and horizons applied across the logging pipeline.
///
/// All length caps are byte budgets, enforced at UTF-8 character
/// boundaries by [`crate::text::truncate_str`].
#[derive(Debug, Clone)]
pub struct Limits {
    /// Max bytes of a tool result kept in an execution step.
    pub max_content_len: usize,
    /// Max bytes of a tool result rendered into a Markdown log.
    pub max_tool_result_len: usize,
    /// Max bytes of a tool's input JSON rendered into a Markdown log.
    pub max_tool_input_len: usize,
    /// Max bytes of a task prompt kept in the cache and rendered logs.
    pub max_prompt_len: usize,
    /// Max events read from a subagent transcript.
    pub max_events: usize,
    /// Max subagent transcript size in megabytes.
    pub max_file_size_mb: u64,
    /// Max events scanned in a parent (session) transcript.
    pub max_parent_events: usize,
    /// Max parent transcript size in megabytes.
    pub max_parent_size_mb: u64,
    /// Retention horizon for correlation-cache entries.
    pub cache_ttl: Duration,
    /// Age beyond which an unreleased lock file is considered stale.
    pub stale_lock: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_content_len: 1000,
            max_tool_result_len: 500,
            max_tool_input_len: 1000,
            max_prompt_len: 500,
            max_events: 1000,
            max_file_size_mb: 10,
            max_parent_events: 500,
            max_parent_size_mb: 5,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            stale_lock: Duration::from_secs(60),
        }
    }
}

impl Limits {
    /// Defaults with `AGENTLOG_*` environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut limits = Self::default();
        limits.apply_env_overrides();
        limits
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = read_env_usize("AGENTLOG_MAX_EVENTS", 1, 100_000) {
            self.max_events = v;
        }
        if let Some(v) = read_env_u64("AGENTLOG_MAX_FILE_SIZE_MB", 1, 1000) {
            self.max_file_size_mb = v;
        }
        if let Some(v) = read_env_u64("AGENTLOG_CACHE_TTL_HOURS", 1, 8760) {
            self.cache_ttl = Duration::from_secs(v * 60 * 60);
        }
        if let Some(v) = read_env_u64("AGENTLOG_STALE_LOCK_SECS", 1, 3600) {
            self.stale_lock = Duration::from_secs(v);
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
