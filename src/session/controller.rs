//! The control loop: the only place that changes session state.
//!
//! One task waits on terminal input, the escape timer, forwarded OS signals
//! and child exit, and services whichever is ready. Terminal mode and the
//! child's lifecycle are only ever touched from here.

use nix::sys::signal::Signal;
use portable_pty::ExitStatus;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::signals::ChildControl;
use super::terminal::{RawMode, Terminal};
use crate::filter::{Classifier, EscapeTimer, Event};
use crate::pty::ChildInput;

/// Where a running session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// Terminal restored, job stopped; waiting to be continued.
    Suspending,
    Terminated,
}

/// Why the session ended.
#[derive(Debug)]
pub enum Termination {
    /// The child exited on its own. `None` if its status couldn't be read.
    ChildExited(Option<ExitStatus>),
    /// The user typed Ctrl+\ and the child was killed.
    Quit,
}

/// Inputs the control loop waits on.
pub struct Channels {
    pub input: mpsc::Receiver<Vec<u8>>,
    pub signals: mpsc::UnboundedReceiver<Signal>,
    pub child_exit: oneshot::Receiver<Option<ExitStatus>>,
}

pub struct Controller<I, T, C>
where
    I: ChildInput,
    T: Terminal,
    C: ChildControl,
{
    classifier: Classifier,
    timer: EscapeTimer,
    pty_input: I,
    mode: RawMode<T>,
    child: C,
    state: SessionState,
    /// Bytes approved by the classifier and not yet written.
    outbound: Vec<u8>,
}

impl<I, T, C> Controller<I, T, C>
where
    I: ChildInput,
    T: Terminal,
    C: ChildControl,
{
    /// Takes over a terminal that is already in raw mode.
    pub fn new(pty_input: I, mode: RawMode<T>, child: C, timer: EscapeTimer) -> Self {
        Self {
            classifier: Classifier::new(),
            timer,
            pty_input,
            mode,
            child,
            state: SessionState::Running,
            outbound: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run until the child exits or the user quits. The terminal mode is
    /// restored before this returns.
    pub async fn run(&mut self, mut channels: Channels) -> Termination {
        let mut input_open = true;

        loop {
            tokio::select! {
                status = &mut channels.child_exit => {
                    let status = status.ok().flatten();
                    info!(?status, "Child exited");
                    return self.terminate(Termination::ChildExited(status));
                }

                () = self.timer.expired() => {
                    debug!(held = ?self.classifier.pending(), "Escape window lapsed");
                    self.release_pending();
                }

                Some(signal) = channels.signals.recv() => {
                    if let Err(e) = self.child.signal(signal) {
                        warn!(?signal, error = %e, "Failed to forward signal");
                    }
                }

                chunk = channels.input.recv(), if input_open => match chunk {
                    Some(data) => {
                        if let Some(termination) = self.feed(&data) {
                            return termination;
                        }
                    }
                    None => {
                        debug!("Terminal input closed");
                        input_open = false;
                        self.release_pending();
                    }
                },
            }
        }
    }

    /// Push raw input through the classifier.
    fn feed(&mut self, data: &[u8]) -> Option<Termination> {
        for &byte in data {
            let emitted = self.classifier.process(byte);
            self.sync_timer();
            if let Some(termination) = self.dispatch(emitted) {
                return Some(termination);
            }
        }
        self.flush_outbound();
        None
    }

    /// Send a held prefix to the child as-is. Only ever yields forwards.
    fn release_pending(&mut self) {
        let released = self.classifier.on_timeout();
        if !released.is_empty() {
            self.dispatch(released);
            self.flush_outbound();
        }
        self.sync_timer();
    }

    fn dispatch(&mut self, events: impl IntoIterator<Item = Event>) -> Option<Termination> {
        for event in events {
            match event {
                Event::Forward(chunk) => self.outbound.extend_from_slice(chunk.as_bytes()),
                Event::Suspend => {
                    self.flush_outbound();
                    self.suspend();
                }
                Event::Quit => {
                    self.flush_outbound();
                    info!("Quit requested");
                    let termination = self.terminate(Termination::Quit);
                    if let Err(e) = self.child.kill() {
                        warn!(error = %e, "Failed to kill child");
                    }
                    return Some(termination);
                }
            }
        }
        None
    }

    /// A held prefix always has exactly one live window; each step that leaves
    /// one held started or extended it.
    fn sync_timer(&mut self) {
        if self.classifier.is_pending() {
            self.timer.arm();
        } else {
            self.timer.cancel();
        }
        debug_assert_eq!(self.timer.is_armed(), self.classifier.is_pending());
    }

    /// Hand approved bytes to the writer. Never waits on the child.
    fn flush_outbound(&mut self) {
        if !self.outbound.is_empty() {
            self.pty_input.queue(std::mem::take(&mut self.outbound));
        }
    }

    /// Hand the terminal back to the shell, stop, and take it again on resume.
    fn suspend(&mut self) {
        self.state = SessionState::Suspending;
        if let Err(e) = self.mode.restore() {
            warn!(error = %e, "Failed to restore terminal before suspend");
        }
        info!("Suspending");
        if let Err(e) = self.mode.suspend_job() {
            warn!(error = %e, "Failed to suspend");
        }
        info!("Resumed");
        if let Err(e) = self.mode.reenter() {
            warn!(error = %e, "Failed to re-enter raw mode after resume");
        }
        self.state = SessionState::Running;
    }

    fn terminate(&mut self, termination: Termination) -> Termination {
        self.state = SessionState::Terminated;
        self.timer.cancel();
        if let Err(e) = self.mode.restore() {
            warn!(error = %e, "Failed to restore terminal mode");
        }
        termination
    }
}
