//! Timing state machine.
//!
//! Converts the watcher's event sequence plus clock ticks into a
//! [`TimingResult`]. Single-writer: only the orchestrator's event loop
//! advances it, which merges the two input channels (events, ticks) under
//! one owner and keeps transition logic race-free.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::models::timing::TimingResult;
use crate::watcher::{SignalEvent, SignalEventKind};

/// Tracker lifecycle.
///
/// `AwaitingSignal` -> `Writing` on signal creation, `Writing` ->
/// `Completed` on signal deletion. `Completed` is also reached directly
/// from `AwaitingSignal` when the protocol is malformed (deletion observed
/// first). `TimedOut` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    AwaitingSignal,
    Writing,
    Completed,
    TimedOut,
}

impl TrackerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackerState::Completed | TrackerState::TimedOut)
    }

    /// Check if transitioning from the current state to `next` is valid.
    pub fn can_transition_to(&self, next: &TrackerState) -> bool {
        if self == next {
            return true;
        }
        match self {
            TrackerState::AwaitingSignal => matches!(
                next,
                TrackerState::Writing | TrackerState::Completed | TrackerState::TimedOut
            ),
            TrackerState::Writing => {
                matches!(next, TrackerState::Completed | TrackerState::TimedOut)
            }
            TrackerState::Completed | TrackerState::TimedOut => false,
        }
    }
}

impl std::fmt::Display for TrackerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerState::AwaitingSignal => write!(f, "awaiting signal"),
            TrackerState::Writing => write!(f, "writing"),
            TrackerState::Completed => write!(f, "completed"),
            TrackerState::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Derives thinking/writing durations from signal events and enforces the
/// session timeout.
pub struct TimingTracker {
    started: Instant,
    timeout: Duration,
    signal_file: String,
    source_file: String,
    state: TrackerState,
    thinking_end: Option<Instant>,
    last_write: Option<Instant>,
    ended: Option<Instant>,
    completed: bool,
    violation: bool,
}

impl TimingTracker {
    pub fn new(
        started: Instant,
        timeout: Duration,
        signal_file: String,
        source_file: String,
    ) -> Self {
        Self {
            started,
            timeout,
            signal_file,
            source_file,
            state: TrackerState::AwaitingSignal,
            thinking_end: None,
            last_write: None,
            ended: None,
            completed: false,
            violation: false,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// True when the signal artifact was deleted before it was created.
    pub fn protocol_violated(&self) -> bool {
        self.violation
    }

    /// Feed one watcher event. Events arriving after a terminal state are
    /// ignored; the terminal outcome wins.
    pub fn on_event(&mut self, event: &SignalEvent) {
        if self.state.is_terminal() {
            return;
        }

        if event.is_signal_artifact(&self.signal_file) {
            self.on_signal_event(event);
        } else if event.is_target_source(&self.source_file) {
            self.on_source_event(event);
        }
    }

    fn on_signal_event(&mut self, event: &SignalEvent) {
        match (self.state, event.kind) {
            (TrackerState::AwaitingSignal, SignalEventKind::Created) => {
                self.thinking_end = Some(event.at);
                self.transition(TrackerState::Writing);
                info!(
                    thinking_millis = self.millis_since_start(event.at),
                    "signal artifact created, writing phase started"
                );
            }
            (TrackerState::AwaitingSignal, SignalEventKind::Deleted) => {
                // Malformed protocol: the artifact vanished before we ever
                // saw it created. All elapsed time is thinking time.
                warn!("signal artifact deleted before creation was observed");
                self.ended = Some(event.at);
                self.violation = true;
                self.transition(TrackerState::Completed);
            }
            (TrackerState::Writing, SignalEventKind::Deleted) => {
                self.ended = Some(event.at);
                self.completed = true;
                self.transition(TrackerState::Completed);
                info!(
                    total_millis = self.millis_since_start(event.at),
                    "signal artifact deleted, session complete"
                );
            }
            // Re-creation while writing is retry traffic; telemetry counts
            // it, timing ignores it.
            _ => {}
        }
    }

    fn on_source_event(&mut self, event: &SignalEvent) {
        if self.state != TrackerState::Writing {
            return;
        }
        match event.kind {
            SignalEventKind::Created | SignalEventKind::Modified => {
                // Last-write-wins; out-of-order timestamps are discarded.
                if self.last_write.is_none_or(|prev| event.at > prev) {
                    self.last_write = Some(event.at);
                }
            }
            SignalEventKind::Deleted => {}
        }
    }

    /// Clock input, checked on every poll tick independent of event
    /// arrival, so a hung agent that never signals still terminates.
    pub fn on_tick(&mut self, now: Instant) {
        if self.state.is_terminal() {
            return;
        }
        if now.saturating_duration_since(self.started) >= self.timeout {
            self.ended = Some(self.started + self.timeout);
            self.transition(TrackerState::TimedOut);
            warn!(timeout_secs = self.timeout.as_secs(), "session timed out");
        }
    }

    fn transition(&mut self, next: TrackerState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid tracker transition: {} -> {next}",
            self.state
        );
        self.state = next;
    }

    /// Timing snapshot at `now`. Total over all states: terminal states
    /// report their fixed end, non-terminal states report partial elapsed
    /// figures, so a failed session still yields data.
    pub fn snapshot(&self, now: Instant) -> TimingResult {
        let end = self.ended.unwrap_or(now);
        let (thinking, writing) = match self.thinking_end {
            Some(thinking_end) => (
                thinking_end.saturating_duration_since(self.started),
                end.saturating_duration_since(thinking_end),
            ),
            None => (end.saturating_duration_since(self.started), Duration::ZERO),
        };

        let thinking_millis = thinking.as_millis() as u64;
        let writing_millis = writing.as_millis() as u64;

        TimingResult {
            thinking_millis,
            writing_millis,
            total_millis: thinking_millis + writing_millis,
            completed: self.completed,
            timed_out: self.state == TrackerState::TimedOut,
            last_write_millis: self
                .last_write
                .map(|at| at.saturating_duration_since(self.started).as_millis() as u64),
        }
    }

    fn millis_since_start(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.started).as_millis() as u64
    }
}
