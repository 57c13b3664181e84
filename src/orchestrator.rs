//! Session orchestration.
//!
//! Wires the watcher, tracker, telemetry, and sampler together for one
//! session, then hands the terminal result to the analysis provider and
//! the scoring engine. A benchmark run fans out one session per target on
//! its own thread; each session's tracker is advanced only by its own
//! event loop, which merges watcher events and clock ticks under a single
//! owner.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::analysis::{AnalysisProvider, JsonFileProvider};
use crate::config::{BenchConfig, SIGNAL_FILE};
use crate::error::WatchError;
use crate::models::analysis::AnalysisSummary;
use crate::models::report::SessionReport;
use crate::models::session::{Session, TerminalReason};
use crate::models::timing::TimingResult;
use crate::report::status::{self, WorkspaceStatus};
use crate::sampler::ResourceSampler;
use crate::scoring;
use crate::telemetry::{Telemetry, TelemetryCounters};
use crate::tracker::{TimingTracker, TrackerState};
use crate::watcher::polling::{PollingOptions, PollingWatcher};
use crate::watcher::{SignalEvent, SignalSource};
use crate::workspace;

/// Live view of one session, refreshed on every tick for the dashboard.
#[derive(Debug, Clone)]
pub struct AgentProgress {
    pub agent: String,
    pub state: TrackerState,
    pub reason: Option<TerminalReason>,
    pub timing: TimingResult,
    pub telemetry: TelemetryCounters,
}

pub type ProgressBoard = Arc<Mutex<BTreeMap<String, AgentProgress>>>;

/// A benchmark run in flight: one session thread per target.
pub struct BenchmarkRun {
    pub board: ProgressBoard,
    pub stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<SessionReport>>,
}

impl BenchmarkRun {
    /// True once every session has a terminal reason on the board.
    pub fn finished(&self) -> bool {
        self.board
            .lock()
            .map(|board| board.values().all(|p| p.reason.is_some()))
            .unwrap_or(true)
    }

    /// Ask every session to wind down at its next tick.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for all sessions and collect their reports.
    pub fn join(self) -> Vec<SessionReport> {
        self.handles
            .into_iter()
            .filter_map(|handle| match handle.join() {
                Ok(report) => Some(report),
                Err(_) => {
                    error!("session thread panicked; dropping its report");
                    None
                }
            })
            .collect()
    }
}

/// Prepare every workspace, then start one session per target.
///
/// All cleanup completes before any watcher starts, so a slow-starting
/// agent never races the pre-clean.
pub fn start(config: Arc<BenchConfig>, prompt: &str) -> Result<BenchmarkRun> {
    if config.targets.is_empty() {
        bail!("No targets configured. Add [[target]] entries to arbiter.toml or pass --workspace.");
    }

    for target in &config.targets {
        workspace::prepare(target, prompt, &config)?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let board: ProgressBoard = Arc::new(Mutex::new(BTreeMap::new()));

    // Seed the whole board before any thread starts so `finished()` never
    // sees a partially-populated run.
    let mut sessions = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        let session = Session::new(
            target.name.clone(),
            target.dir.clone(),
            target.source_file.clone(),
            prompt.to_string(),
            config.timeout(),
        );

        if let Ok(mut board) = board.lock() {
            board.insert(
                session.agent.clone(),
                AgentProgress {
                    agent: session.agent.clone(),
                    state: TrackerState::AwaitingSignal,
                    reason: None,
                    timing: TimingResult {
                        thinking_millis: 0,
                        writing_millis: 0,
                        total_millis: 0,
                        completed: false,
                        timed_out: false,
                        last_write_millis: None,
                    },
                    telemetry: TelemetryCounters::default(),
                },
            );
        }

        sessions.push(session);
    }

    let mut handles = Vec::with_capacity(sessions.len());
    for session in sessions {
        let config = Arc::clone(&config);
        let board = Arc::clone(&board);
        let stop = Arc::clone(&stop);
        handles.push(thread::spawn(move || {
            let provider = JsonFileProvider::new();
            run_session(&session, &config, &provider, &board, &stop)
        }));
    }

    info!(targets = handles.len(), "benchmark run started");
    Ok(BenchmarkRun {
        board,
        stop,
        handles,
    })
}

/// Run one session to its terminal state and produce its report.
pub fn run_session(
    session: &Session,
    config: &BenchConfig,
    provider: &dyn AnalysisProvider,
    board: &ProgressBoard,
    stop: &AtomicBool,
) -> SessionReport {
    let started = Instant::now();

    let mut tracker = TimingTracker::new(
        started,
        session.timeout,
        SIGNAL_FILE.to_string(),
        session.source_file.clone(),
    );
    let mut telemetry = Telemetry::new(
        started,
        SIGNAL_FILE.to_string(),
        config.rapid_save_window(),
    );
    let mut sampler = ResourceSampler::start(config.sample_interval(), started);

    let mut watcher = PollingWatcher::new(
        session.workspace.clone(),
        PollingOptions {
            signal_file: SIGNAL_FILE.to_string(),
            watched_extensions: config.watched_extensions.clone(),
            poll_interval: config.poll_interval(),
            max_read_retries: config.max_read_retries,
        },
    );

    let outcome = match watcher.start() {
        Ok(events) => drive(
            &events,
            &mut tracker,
            &mut telemetry,
            config.poll_interval(),
            stop,
            |tracker, telemetry| publish_progress(board, session, tracker, telemetry, None),
        ),
        Err(err) => DriveOutcome::Fatal(err),
    };

    watcher.stop();
    sampler.stop();

    let timing = tracker.snapshot(Instant::now());
    let reason = terminal_reason(&outcome, &tracker);
    info!(agent = %session.agent, %reason, total_millis = timing.total_millis, "session ended");

    let analysis = load_analysis(session, provider, telemetry.counters());
    let score = scoring::score_session(&timing, session.timeout, analysis.as_ref(), &config.scoring);

    let report = SessionReport {
        session_id: session.id.clone(),
        agent: session.agent.clone(),
        workspace: session.workspace.clone(),
        reason,
        timing,
        telemetry: telemetry.counters(),
        events: telemetry.events().to_vec(),
        samples: sampler.samples(),
        sample_gaps: sampler.gap_count(),
        analysis,
        score,
        rank: 0,
    };

    // Best effort: a session that lost its workspace cannot update it.
    if let Err(err) = status::write(&session.workspace, &WorkspaceStatus::from_report(&report)) {
        warn!(agent = %session.agent, %err, "failed to update workspace status");
    }

    publish_progress(board, session, &tracker, &telemetry, Some(reason));
    report
}

enum DriveOutcome {
    /// The tracker reached a terminal state on its own.
    Terminal,
    Fatal(WatchError),
    Interrupted,
    /// The event channel closed without a fatal message.
    Disconnected,
}

/// Merge the event channel and the clock into the tracker. `recv_timeout`
/// doubles as the tick source, so timeout checks fire even when no events
/// arrive.
fn drive(
    events: &Receiver<Result<SignalEvent, WatchError>>,
    tracker: &mut TimingTracker,
    telemetry: &mut Telemetry,
    tick: Duration,
    stop: &AtomicBool,
    mut on_tick: impl FnMut(&TimingTracker, &Telemetry),
) -> DriveOutcome {
    loop {
        match events.recv_timeout(tick) {
            Ok(Ok(event)) => {
                telemetry.observe(&event);
                tracker.on_event(&event);
            }
            Ok(Err(err)) => return DriveOutcome::Fatal(err),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return DriveOutcome::Disconnected,
        }

        tracker.on_tick(Instant::now());
        on_tick(tracker, telemetry);

        if tracker.state().is_terminal() {
            return DriveOutcome::Terminal;
        }
        if stop.load(Ordering::SeqCst) {
            return DriveOutcome::Interrupted;
        }
    }
}

fn terminal_reason(outcome: &DriveOutcome, tracker: &TimingTracker) -> TerminalReason {
    match outcome {
        DriveOutcome::Terminal => match tracker.state() {
            TrackerState::TimedOut => TerminalReason::TimedOut,
            _ if tracker.protocol_violated() => TerminalReason::SignalViolation,
            _ => TerminalReason::Completed,
        },
        DriveOutcome::Fatal(WatchError::WorkspaceUnavailable { .. }) => {
            TerminalReason::WorkspaceLost
        }
        DriveOutcome::Fatal(_) | DriveOutcome::Disconnected => TerminalReason::IoFailure,
        DriveOutcome::Interrupted => TerminalReason::Interrupted,
    }
}

/// Load the external analysis and fold in watch telemetry where the
/// analyzer has no error/retry figures of its own.
fn load_analysis(
    session: &Session,
    provider: &dyn AnalysisProvider,
    counters: TelemetryCounters,
) -> Option<AnalysisSummary> {
    match provider.analyze(&session.workspace) {
        Ok(mut summary) => {
            summary.error_count = summary.error_count.max(counters.errors);
            summary.retry_count = summary.retry_count.max(counters.retries);
            Some(summary)
        }
        Err(err) => {
            warn!(agent = %session.agent, %err, "analysis unavailable, scoring with defaults");
            None
        }
    }
}

fn publish_progress(
    board: &ProgressBoard,
    session: &Session,
    tracker: &TimingTracker,
    telemetry: &Telemetry,
    reason: Option<TerminalReason>,
) {
    if let Ok(mut board) = board.lock() {
        board.insert(
            session.agent.clone(),
            AgentProgress {
                agent: session.agent.clone(),
                state: tracker.state(),
                reason,
                timing: tracker.snapshot(Instant::now()),
                telemetry: telemetry.counters(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::models::analysis::ArchitectureKind;
    use std::path::Path;

    struct FixedProvider(AnalysisSummary);

    impl AnalysisProvider for FixedProvider {
        fn analyze(&self, _workspace: &Path) -> Result<AnalysisSummary, AnalysisError> {
            Ok(self.0.clone())
        }
    }

    struct NoProvider;

    impl AnalysisProvider for NoProvider {
        fn analyze(&self, workspace: &Path) -> Result<AnalysisSummary, AnalysisError> {
            Err(AnalysisError::Unavailable {
                path: workspace.join("analysis.json"),
            })
        }
    }

    fn test_session() -> Session {
        Session::new(
            "agent-a".to_string(),
            std::path::PathBuf::from("/tmp/bench/agent-a"),
            "main.py".to_string(),
            "prompt".to_string(),
            Duration::from_secs(600),
        )
    }

    #[test]
    fn test_load_analysis_folds_telemetry_counters() {
        let summary = AnalysisSummary {
            architecture: ArchitectureKind::Oop,
            complexity_score: 10.0,
            style_violations: 0,
            imports: Vec::new(),
            unused_imports: Vec::new(),
            error_count: 1,
            retry_count: 0,
            runtime_ok: true,
        };
        let counters = TelemetryCounters {
            saves: 5,
            retries: 2,
            errors: 3,
        };

        let folded = load_analysis(&test_session(), &FixedProvider(summary), counters).unwrap();
        // Watch telemetry wins where it saw more than the analyzer.
        assert_eq!(folded.error_count, 3);
        assert_eq!(folded.retry_count, 2);
    }

    #[test]
    fn test_load_analysis_keeps_larger_analyzer_counts() {
        let summary = AnalysisSummary {
            architecture: ArchitectureKind::Oop,
            complexity_score: 10.0,
            style_violations: 0,
            imports: Vec::new(),
            unused_imports: Vec::new(),
            error_count: 9,
            retry_count: 9,
            runtime_ok: true,
        };
        let folded = load_analysis(
            &test_session(),
            &FixedProvider(summary),
            TelemetryCounters::default(),
        )
        .unwrap();
        assert_eq!(folded.error_count, 9);
        assert_eq!(folded.retry_count, 9);
    }

    #[test]
    fn test_unavailable_analysis_is_none() {
        let result = load_analysis(&test_session(), &NoProvider, TelemetryCounters::default());
        assert!(result.is_none());
    }

    #[test]
    fn test_start_rejects_empty_target_list() {
        let config = Arc::new(BenchConfig::default());
        assert!(start(config, "prompt").is_err());
    }
}
