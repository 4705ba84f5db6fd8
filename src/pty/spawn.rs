//! Child process spawning with PTY setup.

use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Used when the controlling terminal's size can't be read.
pub const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Result of spawning the child
pub struct SpawnResult {
    pub child: Box<dyn Child + Send + Sync>,
    pub master_pty: Box<dyn MasterPty + Send>,
    pub pty_reader: Box<dyn Read + Send>,
    pub pty_writer: Box<dyn Write + Send>,
}

/// Size of the real terminal as (cols, rows).
pub fn terminal_size() -> (u16, u16) {
    match crossterm::terminal::size() {
        Ok(size) => size,
        Err(e) => {
            debug!(error = %e, "Could not read terminal size, using fallback");
            FALLBACK_SIZE
        }
    }
}

pub fn pty_size((cols, rows): (u16, u16)) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Spawn `program` with `args` attached to a fresh PTY of the given size.
///
/// The child inherits our environment and working directory.
pub fn spawn_child(program: &str, args: &[String], size: (u16, u16)) -> Result<SpawnResult> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(pty_size(size))
        .map_err(|e| Error::OpenPty(e.to_string()))?;

    let mut cmd = CommandBuilder::new(program);
    cmd.args(args);
    if let Ok(cwd) = std::env::current_dir() {
        cmd.cwd(&cwd);
    }

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| Error::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    // Drop slave after spawning so the master sees EOF once the child is gone
    drop(pair.slave);

    // Clone reader before take_writer
    let pty_reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| Error::OpenPty(e.to_string()))?;
    let pty_writer = pair
        .master
        .take_writer()
        .map_err(|e| Error::OpenPty(e.to_string()))?;

    info!(
        program,
        ?args,
        cols = size.0,
        rows = size.1,
        pid = ?child.process_id(),
        "Spawned child"
    );

    Ok(SpawnResult {
        child,
        master_pty: pair.master,
        pty_reader,
        pty_writer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_size_maps_cols_and_rows() {
        let size = pty_size((132, 43));
        assert_eq!(size.cols, 132);
        assert_eq!(size.rows, 43);
        assert_eq!(size.pixel_width, 0);
        assert_eq!(size.pixel_height, 0);
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let result = spawn_child("/nonexistent/claude-unfocused-test", &[], FALLBACK_SIZE);
        assert!(matches!(result, Err(Error::Spawn { .. }) | Err(Error::OpenPty(_))));
    }
}
