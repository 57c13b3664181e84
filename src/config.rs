//! Benchmark configuration: protocol file names, timing knobs, scoring
//! calibration, and the target list.
//!
//! Loaded from `arbiter.toml` when present; every field has a default so a
//! partial file (or none at all, when a workspace is given on the command
//! line) is enough to run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Marker file the agent creates to end thinking and deletes to end writing.
pub const SIGNAL_FILE: &str = "start_signal.json";

/// Prompt delivered to each workspace.
pub const TASK_INPUT_FILE: &str = "task_input.txt";

/// Per-workspace progress file maintained by the orchestrator.
pub const STATUS_FILE: &str = "status.json";

/// Drop location for the external analyzer's summary.
pub const ANALYSIS_FILE: &str = "analysis.json";

/// Source extensions observed for modification events.
pub const DEFAULT_WATCHED_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "html", "css", "java", "cpp", "c", "go", "rs", "rb", "php",
    "swift",
];

fn default_watched_extensions() -> Vec<String> {
    DEFAULT_WATCHED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// One benchmarked agent: a name, its workspace, and the source file it is
/// expected to write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub dir: PathBuf,
    pub source_file: String,
}

/// Scoring calibration. The floor for incomplete sessions and the penalty
/// curves are open calibration parameters, so every one of them is a named,
/// tunable field rather than a constant buried in the scoring code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weight_speed: f64,
    pub weight_architecture: f64,
    pub weight_error: f64,
    pub weight_library: f64,
    /// Speed score assigned to timed-out or incomplete sessions.
    pub incomplete_floor: f64,
    /// Complexity above this threshold starts costing architecture points.
    pub complexity_threshold: f64,
    /// Architecture points lost per complexity point over the threshold.
    pub complexity_penalty: f64,
    /// Architecture points lost per style violation.
    pub style_penalty: f64,
    /// Error points lost per recorded error or retry.
    pub error_penalty: f64,
    /// Library points lost per unused import.
    pub unused_import_penalty: f64,
    /// Library points lost per used import outside the standard set.
    pub third_party_penalty: f64,
    /// Imports that are never penalized.
    pub standard_libraries: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_speed: 0.30,
            weight_architecture: 0.30,
            weight_error: 0.25,
            weight_library: 0.15,
            incomplete_floor: 10.0,
            complexity_threshold: 60.0,
            complexity_penalty: 0.5,
            style_penalty: 2.0,
            error_penalty: 10.0,
            unused_import_penalty: 5.0,
            third_party_penalty: 2.0,
            standard_libraries: [
                "os",
                "sys",
                "json",
                "time",
                "math",
                "re",
                "itertools",
                "functools",
                "collections",
                "typing",
                "pathlib",
                "datetime",
                "random",
                "logging",
                "dataclasses",
                "abc",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Top-level benchmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Watcher poll interval in milliseconds. Trades detection latency
    /// against CPU overhead.
    pub poll_interval_ms: u64,
    /// Resource sampler cadence in seconds.
    pub sample_interval_secs: f64,
    /// Session timeout in seconds.
    pub timeout_secs: u64,
    /// Transient filesystem read errors tolerated before the session fails.
    pub max_read_retries: u32,
    /// Remove stale signal artifacts and source files before watching.
    pub clean_before_start: bool,
    /// Two saves of the same file within this window count as an error.
    pub rapid_save_window_ms: u64,
    pub watched_extensions: Vec<String>,
    pub logs_dir: PathBuf,
    pub scoring: ScoringConfig,
    #[serde(rename = "target")]
    pub targets: Vec<TargetConfig>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            sample_interval_secs: 1.0,
            timeout_secs: 600,
            max_read_retries: 5,
            clean_before_start: true,
            rapid_save_window_ms: 2000,
            watched_extensions: default_watched_extensions(),
            logs_dir: PathBuf::from("logs"),
            scoring: ScoringConfig::default(),
            targets: Vec::new(),
        }
    }
}

impl BenchConfig {
    /// Load configuration from the given path, or from `arbiter.toml` in the
    /// current directory. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("arbiter.toml"));

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sample_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rapid_save_window(&self) -> Duration {
        Duration::from_millis(self.rapid_save_window_ms)
    }
}
