//! Per-workspace `status.json` maintenance.
//!
//! Seeded as `pending` when the prompt is distributed, rewritten with the
//! final figures when the session ends. The `status` command reads these
//! back, so the format round-trips.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::STATUS_FILE;
use crate::models::report::SessionReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceStatus {
    pub status: String,
    pub agent: String,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_millis: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writing_millis: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_millis: Option<u64>,
    #[serde(default)]
    pub saves: u32,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
}

impl WorkspaceStatus {
    pub fn pending(agent: &str) -> Self {
        Self {
            status: "pending".to_string(),
            agent: agent.to_string(),
            updated_at: Utc::now(),
            thinking_millis: None,
            writing_millis: None,
            total_millis: None,
            saves: 0,
            retries: 0,
            errors: 0,
            total_score: None,
        }
    }

    pub fn from_report(report: &SessionReport) -> Self {
        Self {
            status: report.reason.to_string(),
            agent: report.agent.clone(),
            updated_at: Utc::now(),
            thinking_millis: Some(report.timing.thinking_millis),
            writing_millis: Some(report.timing.writing_millis),
            total_millis: Some(report.timing.total_millis),
            saves: report.telemetry.saves,
            retries: report.telemetry.retries,
            errors: report.telemetry.errors,
            total_score: Some(report.score.total),
        }
    }
}

pub fn write(workspace: &Path, status: &WorkspaceStatus) -> Result<()> {
    let path = workspace.join(STATUS_FILE);
    let content = serde_json::to_string_pretty(status).context("Failed to serialize status")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Read back a workspace status; `None` when no status file exists yet.
pub fn read(workspace: &Path) -> Result<Option<WorkspaceStatus>> {
    let path = workspace.join(STATUS_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let status = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut status = WorkspaceStatus::pending("agent-a");
        status.status = "completed".to_string();
        status.total_millis = Some(4500);
        status.saves = 3;

        write(temp_dir.path(), &status).unwrap();
        let loaded = read(temp_dir.path()).unwrap().unwrap();
        assert_eq!(loaded.status, "completed");
        assert_eq!(loaded.total_millis, Some(4500));
        assert_eq!(loaded.saves, 3);
    }

    #[test]
    fn test_read_missing_status_is_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read(temp_dir.path()).unwrap().is_none());
    }
}
