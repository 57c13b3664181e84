//! Report output contract: ranking across a run and JSON persistence.
//!
//! The exact rendering (HTML, dashboards) belongs to external
//! collaborators; the core emits one structured JSON document per run and
//! keeps each workspace's `status.json` current.

pub mod status;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ScoringConfig;
use crate::models::report::SessionReport;

/// Top-level document written per run.
#[derive(Debug, Serialize)]
pub struct BenchReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub prompt: &'a str,
    pub weights: Weights,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<&'a str>,
    pub results: &'a [SessionReport],
}

#[derive(Debug, Serialize)]
pub struct Weights {
    pub speed: f64,
    pub architecture: f64,
    pub error: f64,
    pub library: f64,
}

impl From<&ScoringConfig> for Weights {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            speed: config.weight_speed,
            architecture: config.weight_architecture,
            error: config.weight_error,
            library: config.weight_library,
        }
    }
}

/// Assign 1-based ranks by descending total score; ties break by agent
/// name so ranking is deterministic.
pub fn rank(reports: &mut [SessionReport]) {
    reports.sort_by(|a, b| {
        b.score
            .total
            .partial_cmp(&a.score.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.agent.cmp(&b.agent))
    });
    for (index, report) in reports.iter_mut().enumerate() {
        report.rank = index as u32 + 1;
    }
}

pub fn winner(reports: &[SessionReport]) -> Option<&SessionReport> {
    reports.iter().find(|r| r.rank == 1)
}

/// Write the run report as `report_<timestamp>.json` under `logs_dir`.
pub fn save(
    reports: &[SessionReport],
    prompt: &str,
    scoring: &ScoringConfig,
    logs_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let generated_at = Utc::now();
    let path = logs_dir.join(format!(
        "report_{}.json",
        generated_at.format("%Y%m%d_%H%M%S")
    ));

    let truncated_prompt: String = prompt.chars().take(500).collect();
    let report = BenchReport {
        generated_at,
        prompt: &truncated_prompt,
        weights: Weights::from(scoring),
        winner: winner(reports).map(|r| r.agent.as_str()),
        results: reports,
    };

    let content = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "run report saved");
    Ok(path)
}

/// Most recently written run report, if any.
pub fn latest(logs_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(logs_dir).ok()?;
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with("report_") && name.ends_with(".json"))
        })
        .max()
}
