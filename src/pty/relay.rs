//! Byte pumps between the real terminal and the PTY, plus resize propagation.
//!
//! Reads and writes that can block forever (stdin, PTY master) run on their
//! own threads and talk to the async side over channels.

use std::io::{self, Read, Write};
use std::thread;

use portable_pty::MasterPty;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::spawn::{pty_size, terminal_size};

const READ_BUF_SIZE: usize = 4096;
const INPUT_CHANNEL_CAPACITY: usize = 64;

/// Copy child output to `out` untouched until the PTY closes.
///
/// The returned receiver completes once the pump has written everything it read.
pub fn spawn_output_pump<R, W>(mut reader: R, mut out: W) -> oneshot::Receiver<()>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let (done_tx, done_rx) = oneshot::channel();
    thread::spawn(move || {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("PTY output: EOF");
                    break;
                }
                Ok(n) => {
                    if let Err(e) = out.write_all(&buf[..n]).and_then(|()| out.flush()) {
                        warn!(error = %e, "Failed to write child output");
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    // Linux reports EIO on the master once the child side closes.
                    debug!(error = %e, "PTY output: read ended");
                    break;
                }
            }
        }
        let _ = done_tx.send(());
    });
    done_rx
}

/// Read raw terminal input in chunks. The channel closes on EOF or read error.
pub fn spawn_input_pump<R>(mut input: R) -> mpsc::Receiver<Vec<u8>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    thread::spawn(move || {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            match input.read(&mut buf) {
                Ok(0) => {
                    debug!("Terminal input: EOF");
                    break;
                }
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!(error = %e, "Terminal input: read failed");
                    break;
                }
            }
        }
    });
    rx
}

/// Somewhere to queue bytes bound for the child without waiting on it.
pub trait ChildInput {
    fn queue(&mut self, bytes: Vec<u8>);
}

/// Sending half of a [`spawn_writer_pump`].
pub struct PtyInput {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChildInput for PtyInput {
    fn queue(&mut self, bytes: Vec<u8>) {
        if self.tx.send(bytes).is_err() {
            debug!("PTY writer has stopped, dropping input");
        }
    }
}

/// Write queued chunks to the child, in order, on a dedicated thread.
///
/// A child that stops reading only stalls this thread. The pump stops on the
/// first write error or once the [`PtyInput`] is dropped.
pub fn spawn_writer_pump<W>(mut writer: W) -> PtyInput
where
    W: Write + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    thread::spawn(move || {
        while let Some(data) = rx.blocking_recv() {
            // A failed write means the child is going away; its exit ends the session.
            if let Err(e) = writer.write_all(&data).and_then(|()| writer.flush()) {
                debug!(error = %e, "Write to child failed");
                break;
            }
        }
    });
    PtyInput { tx }
}

/// Copy the real terminal's size onto the PTY on every SIGWINCH.
///
/// Notifications that arrive while one is being applied collapse into a
/// single follow-up.
pub fn spawn_resize_watcher(master: Box<dyn MasterPty + Send>) -> io::Result<JoinHandle<()>> {
    let mut winch = signal(SignalKind::window_change())?;
    Ok(tokio::spawn(async move {
        while winch.recv().await.is_some() {
            apply_size(&*master, terminal_size());
        }
    }))
}

/// Resize the PTY. A failure is logged and reported as `false`, never raised.
pub fn apply_size(master: &dyn MasterPty, size: (u16, u16)) -> bool {
    match master.resize(pty_size(size)) {
        Ok(()) => {
            debug!(cols = size.0, rows = size.1, "Resized PTY");
            true
        }
        Err(e) => {
            warn!(error = %e, cols = size.0, rows = size.1, "Failed to resize PTY");
            false
        }
    }
}
