//! Download watching for Cloner
//!
//! This crate provides the download-completion watcher:
//! - Non-recursive observation of one download directory
//! - Per-path debouncing of modification bursts
//! - Size-stability polling to decide a download is finished
//! - Placement of the first finished file, then session teardown

pub mod clock;
pub mod debounce;
pub mod deliver;
pub mod filter;
pub mod session;
pub mod stability;

use notify::event::{ModifyKind, RenameMode};
use std::path::PathBuf;

pub use clock::{CancellableSleeper, Clock, ManualClock, Sleeper, SystemClock, Wake};
pub use debounce::Debouncer;
pub use deliver::{deliver, DeliveryError};
pub use filter::InProgressFilter;
pub use session::{Outcome, Placement, SessionConfig, SessionError, StopHandle, WatchError, WatchSession};
pub use stability::{StabilityCheck, Verdict};

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File contents, metadata or name changed (including rename target)
    Modify,
    /// File deleted or renamed away
    Delete,
    /// Anything else (access, unknown)
    Other,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self { path: path.into(), kind }
    }

    /// Translate a raw observer event into one event per affected path
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        use notify::EventKind as Raw;

        if let Raw::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
            if let [from, to] = event.paths.as_slice() {
                return vec![
                    Self::new(from.clone(), EventKind::Delete),
                    Self::new(to.clone(), EventKind::Modify),
                ];
            }
        }

        let kind = match event.kind {
            Raw::Create(_) => EventKind::Create,
            Raw::Modify(ModifyKind::Name(RenameMode::From)) | Raw::Remove(_) => EventKind::Delete,
            Raw::Modify(_) => EventKind::Modify,
            _ => EventKind::Other,
        };

        event.paths.into_iter().map(|path| Self::new(path, kind)).collect()
    }
}
