//! Session lifecycle: start the child, own the terminal, tear everything down.
//!
//! - `controller`: the control loop and session state machine
//! - `terminal`: raw-mode switching and job control on the real terminal
//! - `signals`: OS signal watching and child signalling

mod controller;
mod signals;
mod terminal;

use std::io;
use std::thread;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::filter::{EscapeTimer, ESCAPE_TIMEOUT};
use crate::pty::{self, SpawnResult};

pub use controller::Termination;
use controller::{Channels, Controller};
use signals::{ChildControl, PtyChild, SignalWatcher};
use terminal::{HostTerminal, RawMode, Terminal};

/// How long to keep copying child output after the child has exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// What to run inside the PTY.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// Run one wrapped session to completion.
///
/// Startup failures are returned with the terminal left as it was found.
/// Once raw mode is entered it is restored on every path out of here.
pub async fn run(config: &SessionConfig) -> Result<Termination> {
    let signal_watcher = SignalWatcher::register()?;

    let size = pty::terminal_size();
    let SpawnResult {
        child,
        master_pty,
        pty_reader,
        pty_writer,
    } = pty::spawn_child(&config.program, &config.args, size)?;
    let mut child_control = PtyChild::new(&*child);

    let (mode, resize_task) = take_terminal(HostTerminal, &mut child_control, || {
        pty::spawn_resize_watcher(master_pty)
    })?;

    let output_done = pty::spawn_output_pump(pty_reader, io::stdout());
    let input = pty::spawn_input_pump(io::stdin());
    let child_exit = spawn_exit_watcher(child);
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let signal_task = tokio::spawn(signal_watcher.forward(signal_tx));

    let mut controller = Controller::new(
        pty::spawn_writer_pump(pty_writer),
        mode,
        child_control,
        EscapeTimer::new(ESCAPE_TIMEOUT),
    );
    let termination = controller
        .run(Channels {
            input,
            signals: signal_rx,
            child_exit,
        })
        .await;

    resize_task.abort();
    signal_task.abort();

    if let Termination::ChildExited(status) = &termination {
        // Let the child's last words reach the screen.
        debug!(?status, "Draining child output");
        if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, output_done)
            .await
            .is_err()
        {
            debug!("Gave up waiting for remaining child output");
        }
    }

    info!(?termination, state = ?controller.state(), "Session ended");
    Ok(termination)
}

/// Enter raw mode and start resize propagation.
///
/// If either step fails the child is killed and the terminal is put back the
/// way it was found.
fn take_terminal<T, C, R>(
    terminal: T,
    child: &mut C,
    watch_resizes: impl FnOnce() -> io::Result<R>,
) -> Result<(RawMode<T>, R)>
where
    T: Terminal,
    C: ChildControl,
{
    let mode = match RawMode::enter(terminal) {
        Ok(mode) => mode,
        Err(e) => return Err(abandon_child(child, Error::RawMode(e))),
    };
    match watch_resizes() {
        Ok(watcher) => Ok((mode, watcher)),
        Err(source) => {
            drop(mode);
            Err(abandon_child(
                child,
                Error::Signals {
                    signal: "SIGWINCH",
                    source,
                },
            ))
        }
    }
}

fn abandon_child<C: ChildControl>(child: &mut C, error: Error) -> Error {
    warn!(error = %error, "Startup failed, killing child");
    if let Err(e) = child.kill() {
        warn!(error = %e, "Failed to kill child");
    }
    error
}

/// Wait for the child on a blocking thread and report its status once.
fn spawn_exit_watcher(
    mut child: Box<dyn portable_pty::Child + Send + Sync>,
) -> oneshot::Receiver<Option<portable_pty::ExitStatus>> {
    let (tx, rx) = oneshot::channel();
    thread::spawn(move || {
        let status = match child.wait() {
            Ok(status) => Some(status),
            Err(e) => {
                debug!(error = %e, "Failed to wait for child");
                None
            }
        };
        let _ = tx.send(status);
    });
    rx
}
