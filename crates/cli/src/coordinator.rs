//! Placement coordinator
//!
//! Turns a pasted code into a placed file: parse, resolve the destination,
//! start a watch session on `<home>/Downloads`, open the URL, then wait for
//! the session's outcome.

use cloner_core::{CodeError, PathError, PathResolver, PlacementRequest};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use watcher::{Outcome, Placement, SessionConfig, SessionError, StopHandle, WatchError, WatchSession};

#[derive(Debug, Error)]
pub enum PlaceError {
    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("no completed download detected within {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("placement cancelled")]
    Stopped,

    #[error("placement worker failed: {0}")]
    Worker(String),
}

/// Opens the URL that triggers a download
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// The system default browser
#[derive(Debug, Clone, Copy, Default)]
pub struct Browser;

impl UrlOpener for Browser {
    fn open(&self, url: &str) -> io::Result<()> {
        webbrowser::open(url)
    }
}

pub struct Coordinator {
    resolver: PathResolver,
    config: SessionConfig,
    opener: Arc<dyn UrlOpener>,
}

impl Coordinator {
    pub fn new(resolver: PathResolver, config: SessionConfig, opener: Arc<dyn UrlOpener>) -> Self {
        Self {
            resolver,
            config,
            opener,
        }
    }

    /// Parse a code and resolve its destination without touching the file system
    pub fn prepare(&self, code: &str) -> Result<(PlacementRequest, PathBuf), PlaceError> {
        let request = PlacementRequest::parse(code)?;
        let destination = self.resolver.resolve(request.destination_path());
        Ok((request, destination))
    }

    /// Directory watched for the download
    pub fn downloads_dir(&self) -> PathBuf {
        self.resolver.downloads_dir()
    }

    /// Place the file described by `code`, blocking until the session ends
    pub fn place(&self, code: &str, stop: StopHandle) -> Result<Placement, PlaceError> {
        let (request, destination) = self.prepare(code)?;
        let downloads = self.resolver.downloads_dir();

        info!(
            "Placing {} into {}",
            request.source_url(),
            destination.display()
        );

        let session = WatchSession::start(&downloads, &destination, self.config.clone(), stop)?;

        if let Err(e) = self.opener.open(request.source_url()) {
            warn!("Could not open {} in a browser: {}", request.source_url(), e);
        }

        match session.wait() {
            Outcome::Placed(placement) => Ok(placement),
            Outcome::Failed(e) => Err(e.into()),
            Outcome::TimedOut(after) => Err(PlaceError::TimedOut(after)),
            Outcome::Stopped => Err(PlaceError::Stopped),
        }
    }

    /// Run [`Coordinator::place`] on a blocking worker
    pub async fn place_async(self: Arc<Self>, code: String, stop: StopHandle) -> Result<Placement, PlaceError> {
        tokio::task::spawn_blocking(move || self.place(&code, stop))
            .await
            .map_err(|e| PlaceError::Worker(e.to_string()))?
    }
}
