//! claude-unfocused - run Claude Code behind a PTY that drops focus events.
//!
//! Terminal multiplexers with focus reporting enabled send `ESC [ I` and
//! `ESC [ O` whenever a pane gains or loses focus. Claude Code can misread
//! those as keystrokes. This wrapper passes all input and output through
//! unchanged except for those two sequences.
//!
//! ```text
//! claude-unfocused [--claude <path>] [claude args...]
//! ```
//!
//! Ctrl+Z suspends the wrapper; Ctrl+\ kills Claude and exits.

#[cfg(not(unix))]
compile_error!("claude-unfocused relies on Unix job control and only builds on Unix targets");

mod cli;
mod config;
mod error;
mod filter;
mod logging;
mod pty;
mod session;

use anyhow::Context;
use tracing::info;

use crate::config::Settings;
use crate::session::SessionConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::parse_args();
    let settings = Settings::load().context("failed to load settings")?;
    if let Some(path) = logging::init(&settings).context("failed to set up logging")? {
        info!(path = %path.display(), "Logging enabled");
    }

    let config = SessionConfig {
        program: config::resolve_program(cli.claude.as_deref(), &settings),
        args: cli.args,
    };
    session::run(&config)
        .await
        .with_context(|| format!("failed to run {}", config.program))?;

    Ok(())
}
