use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One benchmark run for one agent against one workspace.
///
/// Created by the orchestrator at run start and owned by it for the whole
/// session. Timing is derived by the tracker, the final score is attached by
/// the scoring engine; the session itself only carries identity and
/// configuration.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub agent: String,
    pub workspace: PathBuf,
    /// File the agent is expected to write, relative to the workspace.
    pub source_file: String,
    pub prompt: String,
    pub timeout: Duration,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        agent: String,
        workspace: PathBuf,
        source_file: String,
        prompt: String,
        timeout: Duration,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            agent,
            workspace,
            source_file,
            prompt,
            timeout,
            created_at: Utc::now(),
        }
    }

    fn generate_id() -> String {
        let timestamp = Utc::now().timestamp();
        let uuid_short = uuid::Uuid::new_v4()
            .to_string()
            .split('-')
            .next()
            .unwrap_or("")
            .to_string();
        format!("session-{uuid_short}-{timestamp}")
    }
}

/// Why a session ended. Every session gets exactly one of these; a failed
/// session is reported with its reason and whatever partial data exists,
/// never dropped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Signal artifact created then deleted; full timing available.
    Completed,
    /// Signal deleted before it was created, or other protocol breach.
    SignalViolation,
    TimedOut,
    /// Workspace deleted or permissions revoked mid-session.
    WorkspaceLost,
    /// Transient I/O errors exhausted the retry budget.
    IoFailure,
    /// Operator stopped the run.
    Interrupted,
}

impl TerminalReason {
    pub fn is_failure(&self) -> bool {
        !matches!(self, TerminalReason::Completed)
    }
}

impl std::fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalReason::Completed => write!(f, "completed"),
            TerminalReason::SignalViolation => write!(f, "signal violation"),
            TerminalReason::TimedOut => write!(f, "timed out"),
            TerminalReason::WorkspaceLost => write!(f, "workspace lost"),
            TerminalReason::IoFailure => write!(f, "I/O failure"),
            TerminalReason::Interrupted => write!(f, "interrupted"),
        }
    }
}
