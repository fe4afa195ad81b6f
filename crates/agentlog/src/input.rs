//! Worker request intake and project-root validation.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use agentlog_core::paths;

/// Read a worker request from `--input-file` or stdin.
///
/// An input file is deleted after the read regardless of whether the
/// payload decodes; it is a one-shot handoff from the hook.
pub fn read_request<T: DeserializeOwned>(input_file: Option<&Path>) -> Result<T> {
    let raw = match input_file {
        Some(path) => {
            let read = std::fs::read_to_string(path);
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(error = %err, "failed to remove input file");
                }
            }
            read.with_context(|| format!("failed to read input file {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            let _ = std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("invalid worker request JSON")
}

/// Validate a request's project root against `CLAUDE_PROJECT_DIR`.
///
/// Workers are spawned with an attacker-influenceable payload (the hook
/// input came from the session), so when the environment pins a project
/// directory, a request naming any other root is rejected.
pub fn validate_project_root(project_root: &str) -> Option<PathBuf> {
    let root = resolve(Path::new(project_root));
    if let Some(pinned) = std::env::var_os("CLAUDE_PROJECT_DIR").filter(|v| !v.is_empty()) {
        if !roots_match(&root, Path::new(&pinned)) {
            tracing::error!(
                root = %root.display(),
                "project root does not match CLAUDE_PROJECT_DIR"
            );
            return None;
        }
    }
    Some(root)
}

/// Directories a transcript path may resolve into.
pub fn allowed_roots(root: &Path) -> Vec<PathBuf> {
    let mut allowed = Vec::new();
    if let Some(home) = paths::home_dir() {
        allowed.push(home);
    }
    allowed.push(root.to_path_buf());
    allowed
}

fn roots_match(root: &Path, pinned: &Path) -> bool {
    resolve(root) == resolve(pinned)
}

/// Canonicalize when possible; nonexistent paths compare as given.
fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn reads_and_deletes_input_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("req.json");
        std::fs::write(&path, "{\"k\": 1}").unwrap();
        let value: Value = read_request(Some(&path)).unwrap();
        assert_eq!(value["k"], 1);
        assert!(!path.exists());
    }

    #[test]
    fn input_file_deleted_even_when_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("req.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(read_request::<Value>(Some(&path)).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        assert!(read_request::<Value>(Some(&path)).is_err());
    }

    #[test]
    fn identical_roots_match() {
        let dir = TempDir::new().unwrap();
        assert!(roots_match(dir.path(), dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_root_matches_its_target() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(roots_match(&link, &real));
    }

    #[test]
    fn different_roots_do_not_match() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        assert!(!roots_match(a.path(), b.path()));
    }

    #[test]
    fn allowed_roots_end_with_project_root() {
        let dir = TempDir::new().unwrap();
        let allowed = allowed_roots(dir.path());
        assert_eq!(allowed.last().unwrap(), dir.path());
    }
}
