//! Size-stability check
//!
//! Download tools do not reliably report completion, so a file counts as
//! finished once its size stops changing: one sample, then `rounds` further
//! samples each `interval` apart, all equal.

use crate::clock::{Sleeper, Wake};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityCheck {
    /// Wait between two samples
    pub interval: Duration,
    /// Number of waits; `rounds + 1` samples are taken for a stable verdict
    pub rounds: u32,
}

/// Result of one stability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every sample in the window had this size
    Stable { size: u64 },
    /// The size moved from `first` to `last` inside the window
    Unstable { first: u64, last: u64 },
    /// The wait was cancelled before a verdict was reached
    Abandoned,
}

impl StabilityCheck {
    pub fn new(interval: Duration, rounds: u32) -> Self {
        Self { interval, rounds }
    }

    /// Run the check against an arbitrary size source
    ///
    /// Stops at the first differing sample. Sampling errors propagate.
    pub fn run<F, S>(&self, mut sample: F, sleeper: &mut S) -> io::Result<Verdict>
    where
        F: FnMut() -> io::Result<u64>,
        S: Sleeper + ?Sized,
    {
        let first = sample()?;
        let mut previous = first;

        for _ in 0..self.rounds {
            if sleeper.sleep(self.interval) == Wake::Cancelled {
                return Ok(Verdict::Abandoned);
            }

            let current = sample()?;
            if current != previous {
                return Ok(Verdict::Unstable { first, last: current });
            }
            previous = current;
        }

        Ok(Verdict::Stable { size: previous })
    }

    /// Run the check against the size of a file on disk
    pub fn check_file<S: Sleeper + ?Sized>(&self, path: &Path, sleeper: &mut S) -> io::Result<Verdict> {
        self.run(|| fs::metadata(path).map(|m| m.len()), sleeper)
    }
}
