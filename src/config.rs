//! Optional user settings, read from `<config dir>/claude-unfocused/settings.json`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Executable started when neither the command line nor the settings name one.
pub const DEFAULT_PROGRAM: &str = "claude";

const APP_DIR: &str = "claude-unfocused";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Path to the Claude binary
    pub claude: Option<String>,
    /// Where log records go when logging is enabled
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Default settings location, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load from the default location. A missing file means defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| Error::Settings {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Pick the child executable: command line, then settings, then `claude`.
pub fn resolve_program(cli: Option<&str>, settings: &Settings) -> String {
    cli.or(settings.claude.as_deref())
        .unwrap_or(DEFAULT_PROGRAM)
        .to_string()
}

/// Per-user directory for the log file.
pub fn state_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join(APP_DIR))
}
