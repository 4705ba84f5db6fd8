//! OS signal plumbing: watching the wrapper's signals, signalling the child,
//! and stopping our own process group for Ctrl+Z.

use std::io;

use nix::sys::signal::{self, kill, SigHandler, Signal};
use nix::unistd::Pid;
use portable_pty::{Child, ChildKiller};
use tokio::signal::unix::{signal as listen, Signal as Listener, SignalKind};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};

/// What the control loop needs to do to the child.
pub trait ChildControl {
    /// Deliver `signal` to the child process.
    fn signal(&mut self, signal: Signal) -> io::Result<()>;
    /// Forcibly terminate the child.
    fn kill(&mut self) -> io::Result<()>;
}

/// Handle on a child spawned in a PTY. The child itself is owned by the
/// exit watcher; this only holds what is needed to signal it.
pub struct PtyChild {
    pid: Option<Pid>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

impl PtyChild {
    pub fn new(child: &dyn Child) -> Self {
        Self {
            // PIDs always fit in pid_t
            pid: child.process_id().map(|id| Pid::from_raw(id as i32)),
            killer: child.clone_killer(),
        }
    }
}

impl ChildControl for PtyChild {
    fn signal(&mut self, signal: Signal) -> io::Result<()> {
        match self.pid {
            Some(pid) => {
                debug!(%pid, ?signal, "Signalling child");
                kill(pid, signal).map_err(io::Error::from)
            }
            None => Ok(()),
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.pid {
            Some(pid) => {
                debug!(%pid, "Sending SIGKILL");
                kill(pid, Signal::SIGKILL).map_err(io::Error::from)
            }
            None => self.killer.kill(),
        }
    }
}

/// Stop every process in our process group with SIGTSTP, the way the shell
/// would on Ctrl+Z. Returns after the group has been continued.
pub fn stop_process_group() -> io::Result<()> {
    // Default disposition so the signal actually stops us.
    // SAFETY: SigDfl installs no Rust handler.
    let _previous =
        unsafe { signal::signal(Signal::SIGTSTP, SigHandler::SigDfl) }.map_err(io::Error::from)?;
    // pid 0 addresses the caller's process group.
    kill(Pid::from_raw(0), Signal::SIGTSTP).map_err(io::Error::from)
}

/// Interrupt, terminate and quit delivered to the wrapper, to be relayed to
/// the child.
pub struct SignalWatcher {
    interrupt: Listener,
    terminate: Listener,
    quit: Listener,
}

impl SignalWatcher {
    pub fn register() -> Result<Self> {
        Ok(Self {
            interrupt: register(SignalKind::interrupt(), "SIGINT")?,
            terminate: register(SignalKind::terminate(), "SIGTERM")?,
            quit: register(SignalKind::quit(), "SIGQUIT")?,
        })
    }

    /// Send each received signal to `tx` until every stream ends or the
    /// receiver goes away.
    pub async fn forward(mut self, tx: mpsc::UnboundedSender<Signal>) {
        loop {
            let received = tokio::select! {
                Some(()) = self.interrupt.recv() => Signal::SIGINT,
                Some(()) = self.terminate.recv() => Signal::SIGTERM,
                Some(()) = self.quit.recv() => Signal::SIGQUIT,
                else => break,
            };
            debug!(signal = ?received, "Received signal");
            if tx.send(received).is_err() {
                break;
            }
        }
    }
}

fn register(kind: SignalKind, name: &'static str) -> Result<Listener> {
    listen(kind).map_err(|source| Error::Signals {
        signal: name,
        source,
    })
}
