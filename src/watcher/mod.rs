//! Workspace observation.
//!
//! A [`SignalSource`] turns filesystem activity in one workspace into a
//! lazy, unbounded sequence of [`SignalEvent`]s: creation and deletion of
//! the signal artifact, plus modification and deletion of watched source
//! files. The provided implementation polls; the trait exists so a native
//! event-notification backend can be swapped in without touching the
//! timing tracker.

pub mod polling;

pub use polling::PollingWatcher;

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Instant;

use crate::error::WatchError;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEventKind {
    Created,
    Deleted,
    Modified,
}

/// A discrete filesystem observation. Immutable once observed; produced by
/// the watcher, consumed once by the timing tracker.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    pub kind: SignalEventKind,
    pub path: PathBuf,
    pub at: Instant,
}

impl SignalEvent {
    pub fn new(kind: SignalEventKind, path: impl Into<PathBuf>, at: Instant) -> Self {
        Self {
            kind,
            path: path.into(),
            at,
        }
    }

    /// True when this event concerns the named signal artifact.
    pub fn is_signal_artifact(&self, signal_file: &str) -> bool {
        file_name_matches(&self.path, signal_file)
    }

    /// True when this event concerns the named target source file.
    pub fn is_target_source(&self, source_file: &str) -> bool {
        file_name_matches(&self.path, source_file)
    }
}

fn file_name_matches(path: &Path, name: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Capability interface over workspace observation.
///
/// `start` begins observation and hands back the event channel; the
/// sequence is non-restartable and runs until `stop` or a fatal error. A
/// fatal [`WatchError`] arrives on the same channel and is always the last
/// message. Duplicate `Modified` events for the same write are permitted;
/// consumers keep only the last.
pub trait SignalSource {
    fn start(&mut self) -> Result<Receiver<Result<SignalEvent, WatchError>>, WatchError>;

    fn stop(&mut self);
}
