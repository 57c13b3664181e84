use serde::Serialize;
use std::path::PathBuf;

use crate::models::analysis::AnalysisSummary;
use crate::models::session::TerminalReason;
use crate::models::timing::TimingResult;
use crate::sampler::ResourceSample;
use crate::scoring::ScoreBreakdown;
use crate::telemetry::{TelemetryCounters, TelemetryEvent};

/// Everything the core hands to the report writer for one session:
/// timing, the resource sample sequence, the score breakdown, and the
/// terminal reason. Failed sessions carry whatever partial data was
/// computed.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub agent: String,
    pub workspace: PathBuf,
    pub reason: TerminalReason,
    pub timing: TimingResult,
    pub telemetry: TelemetryCounters,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<TelemetryEvent>,
    pub samples: Vec<ResourceSample>,
    pub sample_gaps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisSummary>,
    pub score: ScoreBreakdown,
    /// 1-based rank across the run; 0 until ranked.
    pub rank: u32,
}
