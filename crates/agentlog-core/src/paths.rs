//! Filesystem layout and path-safety checks.
//!
//! All on-disk locations used by the logging pipeline are defined here:
//! the per-project log tree, the line-delimited index files, and the
//! per-user cache directory. [`is_safe_path`] is the single gate every
//! externally supplied path must pass before it is opened.

use std::io;
use std::path::{Path, PathBuf};

/// Directory for rendered per-invocation logs, relative to the project root.
pub const LOG_BASE_DIR: &str = ".claude/logs/agents";
/// Append-only invocation index, relative to the project root.
pub const INDEX_FILE: &str = ".claude/logs/agents/index.jsonl";
/// Directory for rendered session summaries, relative to the project root.
pub const SESSION_SUMMARY_DIR: &str = ".claude/logs/sessions";
/// Append-only user prompt journal, relative to the project root.
pub const USER_PROMPTS_FILE: &str = ".claude/logs/agents/user_prompts.jsonl";

/// Name of the per-user cache directory holding correlation state.
pub const CACHE_DIR_NAME: &str = "agentlog";

/// The user's home directory, from `HOME` (`USERPROFILE` on Windows).
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    let var = "USERPROFILE";
    #[cfg(not(windows))]
    let var = "HOME";
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// The project root from `CLAUDE_PROJECT_DIR`, defaulting to `.`.
#[must_use]
pub fn project_root() -> PathBuf {
    std::env::var_os("CLAUDE_PROJECT_DIR")
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
}

/// Expand a leading `~` or `~/` to the home directory.
///
/// Returns the path unchanged when there is nothing to expand or no home
/// directory is known.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    #[cfg(windows)]
    let rest = path.strip_prefix("~/").or_else(|| path.strip_prefix(r"~\"));
    #[cfg(not(windows))]
    let rest = path.strip_prefix("~/");
    if let Some(rest) = rest {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Path of the invocation index under `root`.
#[must_use]
pub fn index_file(root: &Path) -> PathBuf {
    root.join(INDEX_FILE)
}

/// Path of the user prompt journal under `root`.
#[must_use]
pub fn prompts_file(root: &Path) -> PathBuf {
    root.join(USER_PROMPTS_FILE)
}

/// Directory for rendered agent logs under `root`.
#[must_use]
pub fn agent_log_dir(root: &Path) -> PathBuf {
    root.join(LOG_BASE_DIR)
}

/// Directory for rendered session summaries under `root`.
#[must_use]
pub fn session_summary_dir(root: &Path) -> PathBuf {
    root.join(SESSION_SUMMARY_DIR)
}

/// Lock file guarding `file`, formed by appending `.lock`.
#[must_use]
pub fn lock_path(file: &Path) -> PathBuf {
    let mut os = file.as_os_str().to_owned();
    os.push(".lock");
    PathBuf::from(os)
}

/// Per-user cache directory for correlation state, created on first use.
///
/// `%LOCALAPPDATA%` on Windows and `$XDG_CACHE_HOME` elsewhere take
/// precedence, falling back to `~/.cache`. Tightened to mode 0700 on Unix
/// so other local users cannot pre-plant files in it.
pub fn secure_cache_dir() -> io::Result<PathBuf> {
    #[cfg(windows)]
    let explicit = std::env::var_os("LOCALAPPDATA")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    #[cfg(not(windows))]
    let explicit = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    let dir = pick_cache_dir(explicit, home_dir())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory for cache"))?;
    std::fs::create_dir_all(&dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(err) = std::fs::set_permissions(&dir, perms) {
            tracing::debug!(error = %err, "could not tighten cache dir permissions");
        }
    }
    Ok(dir)
}

fn pick_cache_dir(explicit_base: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(base) = explicit_base {
        return Some(base.join(CACHE_DIR_NAME));
    }
    home.map(|h| h.join(".cache").join(CACHE_DIR_NAME))
}

/// Whether `path` resolves inside one of the `allowed` directories.
///
/// Both sides are canonicalized, so symlinks cannot smuggle a path out of
/// the allow-list and `/tmp/test` does not pass for `/tmp/testing`. A path
/// that cannot be canonicalized (typically: does not exist) is rejected.
#[must_use]
pub fn is_safe_path(path: &Path, allowed: &[PathBuf]) -> bool {
    let Ok(resolved) = path.canonicalize() else {
        return false;
    };
    allowed.iter().any(|prefix| {
        prefix
            .canonicalize()
            .is_ok_and(|p| path_starts_with(&resolved, &p))
    })
}

#[cfg(not(windows))]
fn path_starts_with(path: &Path, prefix: &Path) -> bool {
    path.starts_with(prefix)
}

/// Component-wise case-insensitive prefix check for Windows paths.
#[cfg(windows)]
fn path_starts_with(path: &Path, prefix: &Path) -> bool {
    let mut components = path.components();
    for expected in prefix.components() {
        match components.next() {
            Some(c) if c.as_os_str().eq_ignore_ascii_case(expected.as_os_str()) => {}
            _ => return false,
        }
    }
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
