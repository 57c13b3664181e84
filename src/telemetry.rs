//! Save/retry/error telemetry derived from the raw event stream.
//!
//! Runs alongside the timing tracker over the same events. Saves are any
//! source-file write; a signal artifact re-created after the first creation
//! is a retry; rapid successive saves of one file and source-file deletions
//! are counted as errors (the agent rewrote or threw away its own work).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::watcher::{SignalEvent, SignalEventKind};

/// Aggregated counters, as they appear in reports and in the
/// error/retry input to the scoring engine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelemetryCounters {
    pub saves: u32,
    pub retries: u32,
    pub errors: u32,
}

/// One recorded observation, kept for the report's chronological log.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub offset_millis: u64,
    pub kind: &'static str,
    pub detail: String,
}

pub struct Telemetry {
    session_start: Instant,
    signal_file: String,
    rapid_save_window: Duration,
    counters: TelemetryCounters,
    signal_seen: bool,
    last_save: HashMap<PathBuf, Instant>,
    log: Vec<TelemetryEvent>,
}

impl Telemetry {
    pub fn new(session_start: Instant, signal_file: String, rapid_save_window: Duration) -> Self {
        Self {
            session_start,
            signal_file,
            rapid_save_window,
            counters: TelemetryCounters::default(),
            signal_seen: false,
            last_save: HashMap::new(),
            log: Vec::new(),
        }
    }

    pub fn observe(&mut self, event: &SignalEvent) {
        if event.is_signal_artifact(&self.signal_file) {
            if event.kind == SignalEventKind::Created {
                self.record_signal(event);
            }
            return;
        }

        match event.kind {
            SignalEventKind::Created | SignalEventKind::Modified => self.record_save(event),
            SignalEventKind::Deleted => self.record_delete(event),
        }
    }

    fn record_signal(&mut self, event: &SignalEvent) {
        if self.signal_seen {
            self.counters.retries += 1;
            self.push(event, "retry", "signal artifact re-created");
        } else {
            self.signal_seen = true;
            self.push(event, "signal", "signal artifact first observed");
        }
    }

    fn record_save(&mut self, event: &SignalEvent) {
        let name = file_name(event);
        if let Some(previous) = self.last_save.get(&event.path) {
            let delta = event.at.saturating_duration_since(*previous);
            if delta < self.rapid_save_window {
                self.counters.errors += 1;
                self.push(
                    event,
                    "rapid_save",
                    format!("{name} rewritten after {} ms", delta.as_millis()),
                );
            }
        }
        self.last_save.insert(event.path.clone(), event.at);
        self.counters.saves += 1;
        self.push(event, "save", format!("{name} saved"));
    }

    fn record_delete(&mut self, event: &SignalEvent) {
        if self.last_save.remove(&event.path).is_some() {
            self.counters.errors += 1;
            let name = file_name(event);
            self.push(event, "delete", format!("{name} deleted"));
        }
    }

    fn push(&mut self, event: &SignalEvent, kind: &'static str, detail: impl Into<String>) {
        self.log.push(TelemetryEvent {
            offset_millis: event
                .at
                .saturating_duration_since(self.session_start)
                .as_millis() as u64,
            kind,
            detail: detail.into(),
        });
    }

    pub fn counters(&self) -> TelemetryCounters {
        self.counters
    }

    pub fn events(&self) -> &[TelemetryEvent] {
        &self.log
    }
}

fn file_name(event: &SignalEvent) -> String {
    event
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unnamed>")
        .to_string()
}
