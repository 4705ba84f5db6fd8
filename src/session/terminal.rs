//! Controlling-terminal mode switching and job control.

use std::io;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::debug;

use super::signals;

/// What the session needs from the real terminal.
pub trait Terminal {
    /// Switch to raw mode, remembering the current mode.
    fn enter_raw_mode(&mut self) -> io::Result<()>;
    /// Put back the mode remembered by `enter_raw_mode`.
    fn restore_mode(&mut self) -> io::Result<()>;
    /// Stop this process's job. Returns once it has been continued.
    fn suspend_job(&mut self) -> io::Result<()>;
}

/// The process's own controlling terminal, via crossterm.
#[derive(Debug, Default)]
pub struct HostTerminal;

impl Terminal for HostTerminal {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        enable_raw_mode()
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        disable_raw_mode()
    }

    fn suspend_job(&mut self) -> io::Result<()> {
        signals::stop_process_group()
    }
}

/// Raw mode held for as long as this guard lives.
///
/// Dropping the guard restores the original mode, so every way out of a
/// session (return, error, unwinding) leaves the terminal usable.
pub struct RawMode<T: Terminal> {
    terminal: T,
    active: bool,
}

impl<T: Terminal> RawMode<T> {
    pub fn enter(mut terminal: T) -> io::Result<Self> {
        terminal.enter_raw_mode()?;
        debug!("Entered raw mode");
        Ok(Self {
            terminal,
            active: true,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Restore the original mode. Idempotent; after a failure the guard
    /// stays active and `Drop` tries again.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.active {
            self.terminal.restore_mode()?;
            self.active = false;
            debug!("Restored terminal mode");
        }
        Ok(())
    }

    /// Go back to raw mode after a `restore`. Idempotent.
    pub fn reenter(&mut self) -> io::Result<()> {
        if !self.active {
            self.terminal.enter_raw_mode()?;
            self.active = true;
            debug!("Re-entered raw mode");
        }
        Ok(())
    }

    pub fn suspend_job(&mut self) -> io::Result<()> {
        self.terminal.suspend_job()
    }
}

impl<T: Terminal> Drop for RawMode<T> {
    fn drop(&mut self) {
        if self.is_active() {
            let _ = self.terminal.restore_mode();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Something observable that happened to the terminal or the child.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Write(Vec<u8>),
        Raw,
        Restore,
        Suspend,
        Signal(i32),
        Kill,
    }

    pub type CallLog = Arc<Mutex<Vec<Call>>>;

    /// Records mode changes into a shared log.
    pub struct FakeTerminal {
        pub log: CallLog,
        pub fail_raw: bool,
        /// Number of upcoming `restore_mode` calls that fail.
        pub fail_restores: usize,
    }

    impl FakeTerminal {
        pub fn new(log: &CallLog) -> Self {
            Self {
                log: Arc::clone(log),
                fail_raw: false,
                fail_restores: 0,
            }
        }
    }

    impl Terminal for FakeTerminal {
        fn enter_raw_mode(&mut self) -> io::Result<()> {
            if self.fail_raw {
                return Err(io::Error::other("not a tty"));
            }
            self.log.lock().unwrap().push(Call::Raw);
            Ok(())
        }

        fn restore_mode(&mut self) -> io::Result<()> {
            if self.fail_restores > 0 {
                self.fail_restores -= 1;
                return Err(io::Error::other("tcsetattr failed"));
            }
            self.log.lock().unwrap().push(Call::Restore);
            Ok(())
        }

        fn suspend_job(&mut self) -> io::Result<()> {
            self.log.lock().unwrap().push(Call::Suspend);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Call, CallLog, FakeTerminal};
    use super::*;

    fn calls(log: &CallLog) -> Vec<Call> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_drop_restores_mode() {
        let log = CallLog::default();
        {
            let guard = RawMode::enter(FakeTerminal::new(&log)).unwrap();
            assert!(guard.is_active());
        }
        assert_eq!(calls(&log), vec![Call::Raw, Call::Restore]);
    }

    #[test]
    fn test_restore_is_idempotent() {
        let log = CallLog::default();
        let mut guard = RawMode::enter(FakeTerminal::new(&log)).unwrap();
        guard.restore().unwrap();
        guard.restore().unwrap();
        drop(guard);
        assert_eq!(calls(&log), vec![Call::Raw, Call::Restore]);
    }

    #[test]
    fn test_reenter_after_restore() {
        let log = CallLog::default();
        let mut guard = RawMode::enter(FakeTerminal::new(&log)).unwrap();
        guard.restore().unwrap();
        assert!(!guard.is_active());
        guard.reenter().unwrap();
        guard.reenter().unwrap();
        assert!(guard.is_active());
        drop(guard);
        assert_eq!(
            calls(&log),
            vec![Call::Raw, Call::Restore, Call::Raw, Call::Restore]
        );
    }

    #[test]
    fn test_enter_failure_changes_nothing() {
        let log = CallLog::default();
        let mut terminal = FakeTerminal::new(&log);
        terminal.fail_raw = true;
        assert!(RawMode::enter(terminal).is_err());
        assert!(calls(&log).is_empty());
    }

    #[test]
    fn test_failed_restore_is_retried_on_drop() {
        let log = CallLog::default();
        let mut terminal = FakeTerminal::new(&log);
        terminal.fail_restores = 1;
        let mut guard = RawMode::enter(terminal).unwrap();
        assert!(guard.restore().is_err());
        assert!(guard.is_active());
        drop(guard);
        assert_eq!(calls(&log), vec![Call::Raw, Call::Restore]);
    }
}
