//! Per-path debouncing logic
//!
//! Coalesces bursts of writes to one file into a single check. Each path
//! has at most one pending deadline; a new event for the same path pushes
//! it back to `now + delay`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadlines: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
        }
    }

    /// Arm or re-arm the deadline for `path`
    ///
    /// Returns true when an already pending deadline was replaced.
    pub fn touch(&mut self, path: PathBuf, now: Instant) -> bool {
        self.deadlines.insert(path, now + self.delay).is_some()
    }

    /// Remove and return every path whose deadline has passed, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut due: Vec<(Instant, PathBuf)> = Vec::new();

        self.deadlines.retain(|path, deadline| {
            if *deadline <= now {
                due.push((*deadline, path.clone()));
                false
            } else {
                true
            }
        });

        due.sort();
        due.into_iter().map(|(_, path)| path).collect()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }

    /// Drop every pending deadline, returning how many were cancelled
    pub fn cancel_all(&mut self) -> usize {
        let count = self.deadlines.len();
        self.deadlines.clear();
        count
    }
}
