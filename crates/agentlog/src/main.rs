//! # agentlog
//!
//! Hook binary for subagent task logging: `hook` reads one session
//! lifecycle event from stdin and returns immediately, spawning detached
//! `analyze` and `summarize` workers to render Markdown logs.

#![deny(unsafe_code)]

mod analyze;
mod event;
mod handlers;
mod input;
mod request;
mod spawn;
mod summarize;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Subagent task logger.
#[derive(Parser, Debug)]
#[command(name = "agentlog", about = "Logs subagent task activity from session lifecycle hooks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle one lifecycle event delivered on stdin.
    Hook,
    /// Render one invocation's Markdown log (spawned by `hook`).
    Analyze {
        /// Read the worker request from this file instead of stdin.
        #[arg(long)]
        input_file: Option<PathBuf>,
    },
    /// Render a session summary from the index (spawned by `hook`).
    Summarize {
        /// Read the worker request from this file instead of stdin.
        #[arg(long)]
        input_file: Option<PathBuf>,
    },
}

/// Diagnostics go to stderr only; stdout belongs to the hook protocol.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Hook => handlers::run(),
        Command::Analyze { input_file } => analyze::run(input_file.as_deref()),
        Command::Summarize { input_file } => summarize::run(input_file.as_deref()),
    };
    ExitCode::from(code)
}
