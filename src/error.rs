//! Error taxonomy for benchmark sessions.
//!
//! Watcher failures are session-terminal and carry a reason the
//! orchestrator reports; analysis failures are soft and degrade to
//! documented scoring defaults. Sampling failures never surface here at
//! all, they are counted as gaps by the sampler itself.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal observation failures emitted by a [`SignalSource`](crate::watcher::SignalSource).
#[derive(Debug, Error)]
pub enum WatchError {
    /// The monitored workspace was deleted or its permissions revoked.
    #[error("workspace unavailable: {path}: {message}")]
    WorkspaceUnavailable { path: PathBuf, message: String },

    /// A filesystem read kept failing past the bounded retry budget.
    #[error("I/O error persisted after {attempts} attempts in {path}: {message}")]
    RetriesExhausted {
        path: PathBuf,
        attempts: u32,
        message: String,
    },

    /// The event sequence is non-restartable; `start` was called twice.
    #[error("watcher already started")]
    AlreadyStarted,
}

/// Failures loading the external static-analysis summary.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No analysis output was produced for this workspace.
    #[error("no analysis output found at {path}")]
    Unavailable { path: PathBuf },

    /// Analysis output exists but could not be parsed.
    #[error("malformed analysis output {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}
