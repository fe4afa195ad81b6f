//! Detached worker processes.
//!
//! Hook processes must return to the session quickly, so transcript
//! analysis and summary rendering run in children disconnected from the
//! hook's process group. The parent never waits on the child; a worker
//! that dies mid-write leaves its lock file for staleness takeover by
//! the next acquirer.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Launch `exe <subcommand>` detached, feeding `payload` on its stdin.
///
/// The child joins a new process group so it survives the hook and
/// receives no terminal signals meant for the session.
#[cfg(unix)]
pub fn spawn_detached(exe: &Path, subcommand: &str, payload: &str) -> Result<()> {
    use std::os::unix::process::CommandExt;

    let mut child = Command::new(exe)
        .arg(subcommand)
        .process_group(0)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn {subcommand} worker"))?;

    let mut stdin = child.stdin.take().context("worker stdin unavailable")?;
    stdin
        .write_all(payload.as_bytes())
        .context("failed to write worker payload")?;
    drop(stdin);
    Ok(())
}

/// Launch `exe <subcommand>` detached, passing `payload` via a kept
/// temp file.
///
/// Piped stdin is unreliable across detached process groups on Windows,
/// so the payload goes through `--input-file`; the worker deletes the
/// file after reading it.
#[cfg(windows)]
pub fn spawn_detached(exe: &Path, subcommand: &str, payload: &str) -> Result<()> {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .context("failed to create worker payload file")?;
    file.write_all(payload.as_bytes())
        .context("failed to write worker payload")?;
    let (_, path) = file.keep().context("failed to persist worker payload file")?;

    let _ = Command::new(exe)
        .arg(subcommand)
        .arg("--input-file")
        .arg(&path)
        .creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn {subcommand} worker"))?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
