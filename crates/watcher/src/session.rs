//! Watch sessions
//!
//! A session observes one directory until the first download in it is
//! finished and placed. It owns a single loop thread that multiplexes
//! observer events, verification verdicts, stop requests and debounce
//! deadlines, so the debounce map is never shared.
//!
//! Per path the states are:
//! - idle: nothing pending
//! - debouncing: a deadline is armed; each new write re-arms it
//! - verifying: a worker thread runs the [`StabilityCheck`]
//! - completing: the loop thread copies the file and the session ends
//!
//! Only the loop thread copies, so at most one file is placed per session.
//! Teardown cancels pending deadlines, wakes verifiers so they abandon their
//! check, and drops the observer.

use crate::clock::{CancellableSleeper, Clock, SystemClock};
use crate::debounce::Debouncer;
use crate::deliver::{deliver, DeliveryError};
use crate::filter::InProgressFilter;
use crate::stability::{StabilityCheck, Verdict};
use crate::{EventKind, WatchEvent};
use cloner_core::WatchConfig;
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use notify::{RecursiveMode, Watcher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on one loop wait when nothing is scheduled
const IDLE_TICK: Duration = Duration::from_millis(500);

/// Errors that prevent a session from starting
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("download directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("invalid in-progress suffix pattern: {0}")]
    Pattern(#[from] ignore::Error),

    #[error("failed to observe download directory: {0}")]
    Observer(#[from] notify::Error),

    #[error("failed to spawn session thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Errors that end a running session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to check {}: {source}", path.display())]
    Verify {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("the file system observer stopped unexpectedly")]
    ObserverClosed,

    #[error("the watch session panicked")]
    Panicked,
}

/// Session timings and filters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub stability: StabilityCheck,
    /// Give up after this long without a placed file
    pub timeout: Option<Duration>,
    pub in_progress_suffixes: Vec<String>,
}

impl From<&WatchConfig> for SessionConfig {
    fn from(config: &WatchConfig) -> Self {
        Self {
            debounce: config.debounce(),
            stability: StabilityCheck::new(config.poll_interval(), config.stability_rounds),
            timeout: config.timeout(),
            in_progress_suffixes: config.in_progress_suffixes.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}

/// A placed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// File in the watched directory
    pub source: PathBuf,
    /// Directory the file was copied into
    pub destination: PathBuf,
    /// Full path of the copy
    pub file: PathBuf,
    pub bytes: u64,
    /// Verification cycles started during the session
    pub checks: usize,
}

/// How a session ended
#[derive(Debug)]
pub enum Outcome {
    Placed(Placement),
    Failed(SessionError),
    TimedOut(Duration),
    Stopped,
}

/// Cloneable request to end a session early
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Ask the session to stop; repeated calls are no-ops
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }

    fn signal(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A running watch session
pub struct WatchSession {
    handle: JoinHandle<Outcome>,
    stop: StopHandle,
}

impl WatchSession {
    /// Observe `watched_dir` and place the first finished download in `destination`
    pub fn start(
        watched_dir: &Path,
        destination: &Path,
        config: SessionConfig,
        stop: StopHandle,
    ) -> Result<Self, WatchError> {
        if !watched_dir.is_dir() {
            return Err(WatchError::MissingDirectory(watched_dir.to_path_buf()));
        }

        let (event_tx, event_rx) = unbounded();
        let mut observer = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for event in WatchEvent::from_notify(event) {
                        // Receiver is gone once the session has ended
                        let _ = event_tx.send(event);
                    }
                }
                Err(e) => warn!("File system observer error: {}", e),
            }
        })?;
        observer.watch(watched_dir, RecursiveMode::NonRecursive)?;

        info!("Watching {} for a finished download", watched_dir.display());

        let session = SessionLoop::new(destination, config, Arc::new(SystemClock), event_rx, stop.clone())?;
        Self::spawn(stop, move || {
            let outcome = session.run();
            drop(observer);
            outcome
        })
    }

    /// Run a session fed by an explicit event stream instead of an OS observer
    pub fn from_events(
        events: Receiver<WatchEvent>,
        destination: &Path,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        stop: StopHandle,
    ) -> Result<Self, WatchError> {
        let session = SessionLoop::new(destination, config, clock, events, stop.clone())?;
        Self::spawn(stop, move || session.run())
    }

    fn spawn<F>(stop: StopHandle, run: F) -> Result<Self, WatchError>
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("cloner-session".into())
            .spawn(run)
            .map_err(WatchError::Spawn)?;

        Ok(Self { handle, stop })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Block until the session ends
    pub fn wait(self) -> Outcome {
        self.handle
            .join()
            .unwrap_or(Outcome::Failed(SessionError::Panicked))
    }
}

/// Verdict sent back by a verification worker
struct VerifyReport {
    path: PathBuf,
    result: io::Result<Verdict>,
}

/// State owned by the session thread
struct SessionLoop {
    destination: PathBuf,
    debouncer: Debouncer,
    stability: StabilityCheck,
    timeout: Option<Duration>,
    filter: InProgressFilter,
    clock: Arc<dyn Clock>,
    events: Receiver<WatchEvent>,
    stop: StopHandle,
    verdict_tx: Sender<VerifyReport>,
    verdict_rx: Receiver<VerifyReport>,
    /// Dropping the sender wakes every verifier
    cancel_tx: Option<Sender<()>>,
    cancel_rx: Receiver<()>,
    workers: Vec<JoinHandle<()>>,
    checks: usize,
}

impl SessionLoop {
    fn new(
        destination: &Path,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        events: Receiver<WatchEvent>,
        stop: StopHandle,
    ) -> Result<Self, WatchError> {
        let filter = InProgressFilter::new(&config.in_progress_suffixes)?;
        let (verdict_tx, verdict_rx) = unbounded();
        let (cancel_tx, cancel_rx) = bounded(0);

        Ok(Self {
            destination: destination.to_path_buf(),
            debouncer: Debouncer::new(config.debounce),
            stability: config.stability,
            timeout: config.timeout,
            filter,
            clock,
            events,
            stop,
            verdict_tx,
            verdict_rx,
            cancel_tx: Some(cancel_tx),
            cancel_rx,
            workers: Vec::new(),
            checks: 0,
        })
    }

    fn run(mut self) -> Outcome {
        let events = self.events.clone();
        let verdicts = self.verdict_rx.clone();
        let stop = self.stop.signal().clone();
        let started = self.clock.now();

        let outcome = loop {
            let now = self.clock.now();

            for path in self.debouncer.take_due(now) {
                self.verify(path);
            }

            if let Some(limit) = self.timeout {
                if now.saturating_duration_since(started) >= limit {
                    info!("No finished download after {:?}", limit);
                    break Outcome::TimedOut(limit);
                }
            }

            let wait = self.next_wait(now, started);

            let finished = select! {
                recv(stop) -> _ => {
                    info!("Watch session stopped");
                    Some(Outcome::Stopped)
                }
                recv(events) -> msg => match msg {
                    Ok(event) => {
                        self.on_event(event);
                        None
                    }
                    Err(_) => Some(Outcome::Failed(SessionError::ObserverClosed)),
                },
                recv(verdicts) -> msg => match msg {
                    Ok(report) => self.on_verdict(report),
                    Err(_) => None,
                },
                default(wait) => None,
            };

            if let Some(outcome) = finished {
                break outcome;
            }
        };

        self.teardown();
        outcome
    }

    /// Time until the next deadline or timeout, capped at the idle tick
    fn next_wait(&self, now: Instant, started: Instant) -> Duration {
        let mut wait = IDLE_TICK;

        if let Some(deadline) = self.debouncer.next_deadline() {
            wait = wait.min(deadline.saturating_duration_since(now));
        }
        if let Some(limit) = self.timeout {
            wait = wait.min((started + limit).saturating_duration_since(now));
        }

        wait
    }

    fn on_event(&mut self, event: WatchEvent) {
        match event.kind {
            EventKind::Create => debug!("Created: {}", event.path.display()),
            EventKind::Modify => {
                if self.filter.is_in_progress(&event.path) {
                    debug!("Ignoring in-progress download {}", event.path.display());
                    return;
                }
                if event.path.is_dir() {
                    return;
                }

                let rearmed = self.debouncer.touch(event.path.clone(), self.clock.now());
                if rearmed {
                    debug!("Still writing: {}", event.path.display());
                } else {
                    debug!("Modified: {}", event.path.display());
                }
            }
            EventKind::Delete | EventKind::Other => {}
        }
    }

    fn verify(&mut self, path: PathBuf) {
        self.checks += 1;
        self.workers.retain(|worker| !worker.is_finished());

        info!("Checking whether {} has finished downloading", path.display());

        let check = self.stability;
        let tx = self.verdict_tx.clone();
        let mut sleeper = CancellableSleeper::new(self.cancel_rx.clone());
        let worker_path = path.clone();

        let spawned = thread::Builder::new()
            .name("cloner-verify".into())
            .spawn(move || {
                let result = check.check_file(&worker_path, &mut sleeper);
                let _ = tx.send(VerifyReport {
                    path: worker_path,
                    result,
                });
            });

        match spawned {
            Ok(worker) => self.workers.push(worker),
            Err(e) => {
                let _ = self.verdict_tx.send(VerifyReport { path, result: Err(e) });
            }
        }
    }

    fn on_verdict(&mut self, report: VerifyReport) -> Option<Outcome> {
        let VerifyReport { path, result } = report;

        match result {
            Ok(Verdict::Stable { size }) => {
                info!("{} is complete ({} bytes)", path.display(), size);
                Some(self.complete(path))
            }
            Ok(Verdict::Unstable { first, last }) => {
                info!(
                    "{} is still changing ({} -> {} bytes), waiting for further writes",
                    path.display(),
                    first,
                    last
                );
                None
            }
            Ok(Verdict::Abandoned) => None,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} disappeared during the check", path.display());
                None
            }
            Err(source) => {
                warn!("Checking {} failed: {}", path.display(), source);
                Some(Outcome::Failed(SessionError::Verify { path, source }))
            }
        }
    }

    fn complete(&mut self, source: PathBuf) -> Outcome {
        match deliver(&source, &self.destination) {
            Ok((file, bytes)) => {
                info!("Placed {} at {}", source.display(), file.display());
                Outcome::Placed(Placement {
                    source,
                    destination: self.destination.clone(),
                    file,
                    bytes,
                    checks: self.checks,
                })
            }
            Err(e) => {
                warn!("{}", e);
                Outcome::Failed(e.into())
            }
        }
    }

    fn teardown(&mut self) {
        let cancelled = self.debouncer.cancel_all();
        if cancelled > 0 {
            debug!("Cancelled {} pending checks", cancelled);
        }

        drop(self.cancel_tx.take());
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::fs;
    use tempfile::TempDir;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            debounce: Duration::from_millis(100),
            stability: StabilityCheck::new(Duration::from_millis(40), 3),
            timeout: Some(Duration::from_secs(10)),
            in_progress_suffixes: vec![".crdownload".into(), ".part".into(), ".tmp".into()],
        }
    }

    struct Fixture {
        _dir: TempDir,
        downloads: PathBuf,
        destination: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let downloads = dir.path().join("Downloads");
        fs::create_dir_all(&downloads).unwrap();
        let destination = dir.path().join("Desktop");
        Fixture {
            downloads,
            destination,
            _dir: dir,
        }
    }

    fn modify(path: &Path) -> WatchEvent {
        WatchEvent::new(path, EventKind::Modify)
    }

    fn start_scripted(fx: &Fixture, config: SessionConfig) -> (Sender<WatchEvent>, WatchSession) {
        let (tx, rx) = unbounded();
        let session = WatchSession::from_events(
            rx,
            &fx.destination,
            config,
            Arc::new(SystemClock),
            StopHandle::new(),
        )
        .unwrap();
        (tx, session)
    }

    #[test]
    fn test_stable_file_is_placed() {
        let fx = fixture();
        let file = fx.downloads.join("report.pdf");
        fs::write(&file, b"%PDF-1.7").unwrap();

        let (tx, session) = start_scripted(&fx, fast_config());
        tx.send(modify(&file)).unwrap();

        match session.wait() {
            Outcome::Placed(p) => {
                assert_eq!(p.source, file);
                assert_eq!(p.destination, fx.destination);
                assert_eq!(p.file, fx.destination.join("report.pdf"));
                assert_eq!(p.bytes, 8);
                assert_eq!(p.checks, 1);
            }
            other => panic!("expected placement, got {:?}", other),
        }
        assert_eq!(fs::read(fx.destination.join("report.pdf")).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_rapid_events_trigger_one_check() {
        let fx = fixture();
        let file = fx.downloads.join("burst.bin");
        fs::write(&file, vec![1u8; 64]).unwrap();

        // An uncoalesced second deadline would land inside the first check
        let mut config = fast_config();
        config.debounce = Duration::from_millis(500);
        config.stability = StabilityCheck::new(Duration::from_millis(100), 3);

        let (tx, session) = start_scripted(&fx, config);
        tx.send(modify(&file)).unwrap();
        thread::sleep(Duration::from_millis(10));
        tx.send(modify(&file)).unwrap();

        match session.wait() {
            Outcome::Placed(p) => assert_eq!(p.checks, 1),
            other => panic!("expected placement, got {:?}", other),
        }
    }

    #[test]
    fn test_debounce_follows_injected_clock() {
        let fx = fixture();
        let file = fx.downloads.join("held.bin");
        fs::write(&file, b"held").unwrap();

        let clock = Arc::new(ManualClock::new());
        let (tx, rx) = unbounded();
        let session = WatchSession::from_events(
            rx,
            &fx.destination,
            fast_config(),
            clock.clone(),
            StopHandle::new(),
        )
        .unwrap();

        tx.send(modify(&file)).unwrap();

        // Real time passes but the session clock does not
        thread::sleep(Duration::from_millis(400));
        assert!(!fx.destination.exists());

        clock.advance(Duration::from_millis(100));

        match session.wait() {
            Outcome::Placed(p) => {
                assert_eq!(p.file, fx.destination.join("held.bin"));
                assert_eq!(p.checks, 1);
            }
            other => panic!("expected placement, got {:?}", other),
        }
    }

    #[test]
    fn test_concurrent_downloads_place_only_one() {
        let fx = fixture();
        let names = ["a.bin", "b.bin", "c.bin"];
        for name in names {
            fs::write(fx.downloads.join(name), name.as_bytes()).unwrap();
        }

        let mut config = fast_config();
        config.stability = StabilityCheck::new(Duration::from_millis(60), 3);

        let (tx, session) = start_scripted(&fx, config);
        tx.send(modify(&fx.downloads.join("a.bin"))).unwrap();
        tx.send(modify(&fx.downloads.join("b.bin"))).unwrap();
        // Arrives while the first two are being checked
        thread::sleep(Duration::from_millis(200));
        tx.send(modify(&fx.downloads.join("c.bin"))).unwrap();

        let placement = match session.wait() {
            Outcome::Placed(p) => p,
            other => panic!("expected placement, got {:?}", other),
        };

        let placed_names = |dir: &Path| -> Vec<String> {
            fs::read_dir(dir)
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        };

        let placed = placed_names(&fx.destination);
        assert_eq!(placed.len(), 1, "placed {:?}", placed);
        assert_eq!(fx.destination.join(&placed[0]), placement.file);
        assert!(names.contains(&placed[0].as_str()));

        // Abandoned checks and cancelled deadlines must not copy later
        thread::sleep(Duration::from_millis(500));
        assert_eq!(placed_names(&fx.destination), placed);
    }

    #[test]
    fn test_growing_file_is_not_placed() {
        let fx = fixture();
        let file = fx.downloads.join("growing.iso");
        fs::write(&file, b"").unwrap();

        let writer_path = file.clone();
        let writer = thread::spawn(move || {
            use std::io::Write;
            let mut f = fs::OpenOptions::new().append(true).open(writer_path).unwrap();
            for _ in 0..250 {
                f.write_all(b"chunk").unwrap();
                f.flush().unwrap();
                thread::sleep(Duration::from_millis(5));
            }
        });

        // Writer keeps appending until after the timeout
        let mut config = fast_config();
        config.stability = StabilityCheck::new(Duration::from_millis(150), 3);
        config.timeout = Some(Duration::from_millis(900));

        let (tx, session) = start_scripted(&fx, config);
        tx.send(modify(&file)).unwrap();

        let outcome = session.wait();
        writer.join().unwrap();

        assert!(matches!(outcome, Outcome::TimedOut(_)), "got {:?}", outcome);
        assert!(!fx.destination.join("growing.iso").exists());
    }

    #[test]
    fn test_in_progress_files_are_ignored() {
        let fx = fixture();
        let partial = fx.downloads.join("movie.mkv.part");
        fs::write(&partial, b"partial").unwrap();

        let mut config = fast_config();
        config.timeout = Some(Duration::from_millis(400));

        let (tx, session) = start_scripted(&fx, config);
        tx.send(modify(&partial)).unwrap();

        assert!(matches!(session.wait(), Outcome::TimedOut(_)));
        assert!(!fx.destination.exists());
    }

    #[test]
    fn test_create_events_alone_do_not_place() {
        let fx = fixture();
        let file = fx.downloads.join("a.txt");
        fs::write(&file, b"a").unwrap();

        let mut config = fast_config();
        config.timeout = Some(Duration::from_millis(400));

        let (tx, session) = start_scripted(&fx, config);
        tx.send(WatchEvent::new(&file, EventKind::Create)).unwrap();

        assert!(matches!(session.wait(), Outcome::TimedOut(_)));
    }

    #[test]
    fn test_vanished_file_is_not_a_failure() {
        let fx = fixture();
        let mut config = fast_config();
        config.timeout = Some(Duration::from_millis(400));

        let (tx, session) = start_scripted(&fx, config);
        tx.send(modify(&fx.downloads.join("placeholder.zip"))).unwrap();

        assert!(matches!(session.wait(), Outcome::TimedOut(_)));
    }

    #[test]
    fn test_copy_failure_ends_session() {
        let fx = fixture();
        let file = fx.downloads.join("a.txt");
        fs::write(&file, b"a").unwrap();
        // Destination exists as a regular file
        fs::write(&fx.destination, b"blocker").unwrap();

        let (tx, session) = start_scripted(&fx, fast_config());
        tx.send(modify(&file)).unwrap();

        match session.wait() {
            Outcome::Failed(SessionError::Delivery(DeliveryError::DirectoryCreation { path, .. })) => {
                assert_eq!(path, fx.destination);
            }
            other => panic!("expected directory creation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_ends_session() {
        let fx = fixture();
        let (_tx, session) = start_scripted(&fx, fast_config());

        session.stop_handle().stop();
        assert!(matches!(session.wait(), Outcome::Stopped));
    }

    #[test]
    fn test_stop_abandons_running_check() {
        let fx = fixture();
        let file = fx.downloads.join("slow.bin");
        fs::write(&file, b"x").unwrap();

        let mut config = fast_config();
        config.debounce = Duration::from_millis(10);
        config.stability = StabilityCheck::new(Duration::from_secs(30), 5);

        let (tx, session) = start_scripted(&fx, config);
        let stop = session.stop_handle();
        tx.send(modify(&file)).unwrap();
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        stop.stop();
        assert!(matches!(session.wait(), Outcome::Stopped));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!fx.destination.exists());
    }

    #[test]
    fn test_closed_event_stream_fails_session() {
        let fx = fixture();
        let (tx, session) = start_scripted(&fx, fast_config());
        drop(tx);

        assert!(matches!(
            session.wait(),
            Outcome::Failed(SessionError::ObserverClosed)
        ));
    }

    #[test]
    fn test_missing_directory() {
        let fx = fixture();
        let result = WatchSession::start(
            &fx.downloads.join("nope"),
            &fx.destination,
            fast_config(),
            StopHandle::new(),
        );
        assert!(matches!(result, Err(WatchError::MissingDirectory(_))));
    }

    #[test]
    fn test_observer_places_real_download() {
        let fx = fixture();
        let session = WatchSession::start(&fx.downloads, &fx.destination, fast_config(), StopHandle::new()).unwrap();

        // Let the observer settle before writing
        thread::sleep(Duration::from_millis(100));
        fs::write(fx.downloads.join("setup.bin"), vec![7u8; 4096]).unwrap();

        match session.wait() {
            Outcome::Placed(p) => {
                assert_eq!(p.file, fx.destination.join("setup.bin"));
                assert_eq!(p.bytes, 4096);
            }
            other => panic!("expected placement, got {:?}", other),
        }
    }

    #[test]
    fn test_later_files_are_not_placed_after_completion() {
        let fx = fixture();
        let session = WatchSession::start(&fx.downloads, &fx.destination, fast_config(), StopHandle::new()).unwrap();

        thread::sleep(Duration::from_millis(100));
        fs::write(fx.downloads.join("first.txt"), b"first").unwrap();
        assert!(matches!(session.wait(), Outcome::Placed(_)));

        fs::write(fx.downloads.join("second.txt"), b"second").unwrap();
        thread::sleep(Duration::from_millis(500));

        assert!(fx.destination.join("first.txt").exists());
        assert!(!fx.destination.join("second.txt").exists());
    }

    #[test]
    fn test_session_config_from_watch_config() {
        let config = SessionConfig::from(&WatchConfig::default());
        assert_eq!(config.debounce, Duration::from_secs(3));
        assert_eq!(config.stability, StabilityCheck::new(Duration::from_millis(1500), 5));
        assert_eq!(config.timeout, Some(Duration::from_secs(3600)));
    }
}
