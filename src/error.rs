//! Error type for session startup and configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open pseudo-terminal: {0}")]
    OpenPty(String),

    #[error("failed to start `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("failed to switch terminal to raw mode")]
    RawMode(#[source] io::Error),

    #[error("failed to install {signal} handler")]
    Signals {
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file {}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid log filter in {var}: {reason}")]
    LogFilter { var: &'static str, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
