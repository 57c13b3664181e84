//! Polling implementation of [`SignalSource`].
//!
//! Scans the workspace every poll interval and diffs snapshots into
//! events. Inherently a sampling approximation of true event notification:
//! an event is reported at most one poll interval after the underlying
//! change becomes visible, and changes that cancel out within one interval
//! are not observed.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use super::{SignalEvent, SignalEventKind, SignalSource};
use crate::config;
use crate::error::WatchError;

/// Knobs for one polling watcher.
#[derive(Debug, Clone)]
pub struct PollingOptions {
    pub signal_file: String,
    pub watched_extensions: Vec<String>,
    pub poll_interval: Duration,
    pub max_read_retries: u32,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            signal_file: config::SIGNAL_FILE.to_string(),
            watched_extensions: config::DEFAULT_WATCHED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            poll_interval: Duration::from_millis(100),
            max_read_retries: 5,
        }
    }
}

/// Polling watcher over one workspace directory.
pub struct PollingWatcher {
    workspace: PathBuf,
    options: PollingOptions,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    started: bool,
}

impl PollingWatcher {
    pub fn new(workspace: PathBuf, options: PollingOptions) -> Self {
        Self {
            workspace,
            options,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
            started: false,
        }
    }
}

impl SignalSource for PollingWatcher {
    fn start(&mut self) -> Result<Receiver<Result<SignalEvent, WatchError>>, WatchError> {
        if self.started {
            return Err(WatchError::AlreadyStarted);
        }
        self.started = true;

        let (tx, rx) = mpsc::channel();
        let workspace = self.workspace.clone();
        let options = self.options.clone();
        let stop = Arc::clone(&self.stop);

        debug!(workspace = %workspace.display(), "starting polling watcher");
        self.handle = Some(thread::spawn(move || {
            poll_loop(&workspace, &options, &stop, &tx);
        }));

        Ok(rx)
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PollingWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One observed state of the workspace.
#[derive(Debug, Default)]
struct Snapshot {
    signal_path: Option<PathBuf>,
    sources: HashMap<PathBuf, SystemTime>,
}

fn poll_loop(
    workspace: &Path,
    options: &PollingOptions,
    stop: &AtomicBool,
    tx: &Sender<Result<SignalEvent, WatchError>>,
) {
    // The first scan is the baseline: pre-existing files produce no events.
    let mut baseline = match scan(workspace, options) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            let _ = tx.send(Err(workspace_unavailable(workspace, &err)));
            return;
        }
    };

    let mut retries: u32 = 0;

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(options.poll_interval);
        if stop.load(Ordering::SeqCst) {
            return;
        }

        match scan(workspace, options) {
            Ok(snapshot) => {
                retries = 0;
                let now = Instant::now();
                for event in diff(&baseline, &snapshot, now) {
                    if tx.send(Ok(event)).is_err() {
                        return;
                    }
                }
                baseline = snapshot;
            }
            Err(err) if is_fatal(&err) => {
                warn!(workspace = %workspace.display(), %err, "workspace became unavailable");
                let _ = tx.send(Err(workspace_unavailable(workspace, &err)));
                return;
            }
            Err(err) => {
                retries += 1;
                warn!(
                    workspace = %workspace.display(),
                    attempt = retries,
                    %err,
                    "transient read error while scanning workspace"
                );
                if retries > options.max_read_retries {
                    let _ = tx.send(Err(WatchError::RetriesExhausted {
                        path: workspace.to_path_buf(),
                        attempts: retries,
                        message: err.to_string(),
                    }));
                    return;
                }
            }
        }
    }
}

fn workspace_unavailable(workspace: &Path, err: &io::Error) -> WatchError {
    WatchError::WorkspaceUnavailable {
        path: workspace.to_path_buf(),
        message: err.to_string(),
    }
}

fn is_fatal(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}

/// Scan the workspace recursively. Failure to read the workspace root is an
/// error; entries that vanish mid-scan are simply skipped.
fn scan(workspace: &Path, options: &PollingOptions) -> io::Result<Snapshot> {
    let mut snapshot = Snapshot::default();
    walk(workspace, options, &mut snapshot, true)?;
    Ok(snapshot)
}

fn walk(
    dir: &Path,
    options: &PollingOptions,
    snapshot: &mut Snapshot,
    is_root: bool,
) -> io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if is_root => return Err(err),
        Err(_) => return Ok(()),
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            walk(&path, options, snapshot, false)?;
            continue;
        }

        if path.file_name().and_then(|n| n.to_str()) == Some(options.signal_file.as_str()) {
            snapshot.signal_path = Some(path);
            continue;
        }

        if has_watched_extension(&path, &options.watched_extensions) {
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                snapshot.sources.insert(path, modified);
            }
        }
    }

    Ok(())
}

fn has_watched_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|w| *w == ext)
        })
}

/// Diff two snapshots into events. Signal creation is reported before
/// source activity and signal deletion after it, so consumers see phase
/// boundaries in causal order even when one poll interval covers both.
fn diff(before: &Snapshot, after: &Snapshot, now: Instant) -> Vec<SignalEvent> {
    let mut events = Vec::new();

    if before.signal_path.is_none() {
        if let Some(path) = &after.signal_path {
            events.push(SignalEvent::new(SignalEventKind::Created, path.clone(), now));
        }
    }

    for (path, modified) in &after.sources {
        match before.sources.get(path) {
            None => events.push(SignalEvent::new(SignalEventKind::Created, path.clone(), now)),
            Some(previous) if previous != modified => {
                events.push(SignalEvent::new(SignalEventKind::Modified, path.clone(), now));
            }
            Some(_) => {}
        }
    }

    for path in before.sources.keys() {
        if !after.sources.contains_key(path) {
            events.push(SignalEvent::new(SignalEventKind::Deleted, path.clone(), now));
        }
    }

    if after.signal_path.is_none() {
        if let Some(path) = &before.signal_path {
            events.push(SignalEvent::new(SignalEventKind::Deleted, path.clone(), now));
        }
    }

    events
}
