//! Time sources and waits
//!
//! Debouncing reads time through [`Clock`] and stability checks wait through
//! [`Sleeper`], so both can be driven without real timers in tests.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    Cancelled,
}

/// Blocking wait between two samples
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration) -> Wake;
}

/// Real sleep that ends early once its cancel channel disconnects
///
/// The owner cancels every outstanding wait at once by dropping the
/// sending half.
#[derive(Debug, Clone)]
pub struct CancellableSleeper {
    cancel: Receiver<()>,
}

impl CancellableSleeper {
    pub fn new(cancel: Receiver<()>) -> Self {
        Self { cancel }
    }
}

impl Sleeper for CancellableSleeper {
    fn sleep(&mut self, duration: Duration) -> Wake {
        match self.cancel.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => Wake::Elapsed,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Wake::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_manual_clock_advances_only_on_request() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.now() - start, Duration::from_secs(3));
    }

    #[test]
    fn test_cancellable_sleeper_elapses() {
        let (_tx, rx) = bounded::<()>(1);
        let mut sleeper = CancellableSleeper::new(rx);
        assert_eq!(sleeper.sleep(Duration::from_millis(5)), Wake::Elapsed);
    }

    #[test]
    fn test_cancellable_sleeper_wakes_on_disconnect() {
        let (tx, rx) = bounded::<()>(1);
        let mut sleeper = CancellableSleeper::new(rx);
        drop(tx);

        let started = Instant::now();
        assert_eq!(sleeper.sleep(Duration::from_secs(30)), Wake::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
