//! Single-slot timer for the escape disambiguation window.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{self, Instant, Sleep};

/// How long a held `ESC` / `ESC [` prefix waits for its next byte.
///
/// Long enough that a sequence split by a slow transport stays whole, short
/// enough that a lone Escape keypress feels immediate.
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// At most one outstanding deadline. Arming replaces any previous deadline,
/// so a cancelled or superseded window can never fire.
pub struct EscapeTimer {
    window: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl EscapeTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            sleep: None,
        }
    }

    /// Start (or restart) the window from now.
    pub fn arm(&mut self) {
        let deadline = Instant::now() + self.window;
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.sleep = Some(Box::pin(time::sleep_until(deadline))),
        }
    }

    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Resolves once when the armed window lapses, then disarms itself.
    /// Never resolves while disarmed.
    ///
    /// Cancel safe: dropping the future before it completes keeps the deadline.
    pub async fn expired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => future::pending::<()>().await,
        }
        self.sleep = None;
    }
}

impl Default for EscapeTimer {
    fn default() -> Self {
        Self::new(ESCAPE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_window() {
        let mut timer = EscapeTimer::default();
        timer.arm();
        let start = Instant::now();
        timer.expired().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= ESCAPE_TIMEOUT && elapsed < ESCAPE_TIMEOUT + Duration::from_millis(5));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let mut timer = EscapeTimer::default();
        let fired = time::timeout(Duration::from_secs(1), timer.expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let mut timer = EscapeTimer::default();
        timer.arm();
        timer.cancel();
        assert!(!timer.is_armed());
        let fired = time::timeout(Duration::from_millis(200), timer.expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_restarts_window() {
        let mut timer = EscapeTimer::default();
        let start = Instant::now();
        timer.arm();
        time::sleep(Duration::from_millis(30)).await;
        timer.arm();
        timer.expired().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(80) && elapsed < Duration::from_millis(85));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_deadline() {
        let mut timer = EscapeTimer::default();
        timer.arm();
        let early = time::timeout(Duration::from_millis(10), timer.expired()).await;
        assert!(early.is_err());
        assert!(timer.is_armed());
        timer.expired().await;
        assert!(!timer.is_armed());
    }
}
