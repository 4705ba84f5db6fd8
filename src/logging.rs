//! File-backed tracing setup.
//!
//! The terminal belongs to the child while a session runs, so nothing is
//! logged unless `CLAUDE_UNFOCUSED_LOG` is set, and then only to a file.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{self, Settings};
use crate::error::{Error, Result};

/// Environment variable holding the filter directive, e.g. `debug`.
pub const LOG_ENV: &str = "CLAUDE_UNFOCUSED_LOG";

const LOG_FILE: &str = "claude-unfocused.log";

/// Install the subscriber if logging was requested. Returns the log path.
pub fn init(settings: &Settings) -> Result<Option<PathBuf>> {
    let Some(directive) = std::env::var_os(LOG_ENV) else {
        return Ok(None);
    };
    let filter = EnvFilter::try_new(directive.to_string_lossy()).map_err(|e| Error::LogFilter {
        var: LOG_ENV,
        reason: e.to_string(),
    })?;

    let Some(path) = settings.log_file.clone().or_else(default_log_path) else {
        return Ok(None);
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(Some(path))
}

fn default_log_path() -> Option<PathBuf> {
    config::state_dir().map(|dir| dir.join(LOG_FILE))
}
