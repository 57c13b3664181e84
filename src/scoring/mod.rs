//! Scoring engine.
//!
//! A pure function from timing and analysis inputs to a weighted
//! [`ScoreBreakdown`]. No I/O, no side effects; identical inputs always
//! yield identical output, and the function is total over every reachable
//! input state, including a missing analysis summary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ScoringConfig;
use crate::models::analysis::{AnalysisSummary, ArchitectureKind};
use crate::models::timing::TimingResult;

/// Sub-score substituted when no analysis summary is available:
/// architecture and library take the worst case, errors stay neutral.
pub const MISSING_ARCHITECTURE_SCORE: f64 = 0.0;
pub const MISSING_ERROR_SCORE: f64 = 50.0;
pub const MISSING_LIBRARY_SCORE: f64 = 0.0;

/// Weighted sub-scores for one session, each in [0, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub speed: f64,
    pub architecture: f64,
    pub error: f64,
    pub library: f64,
    pub total: f64,
}

/// Compute the composite score for one session.
pub fn score_session(
    timing: &TimingResult,
    timeout: Duration,
    analysis: Option<&AnalysisSummary>,
    config: &ScoringConfig,
) -> ScoreBreakdown {
    let speed = speed_score(timing, timeout, config);

    let (architecture, error, library) = match analysis {
        Some(summary) => (
            architecture_score(summary, config),
            error_score(summary, config),
            library_score(summary, config),
        ),
        None => (
            MISSING_ARCHITECTURE_SCORE,
            MISSING_ERROR_SCORE,
            MISSING_LIBRARY_SCORE,
        ),
    };

    let total = clamp(
        speed * config.weight_speed
            + architecture * config.weight_architecture
            + error * config.weight_error
            + library * config.weight_library,
    );

    ScoreBreakdown {
        speed,
        architecture,
        error,
        library,
        total,
    }
}

/// Monotonically decreasing in total time relative to the timeout. A
/// timed-out or incomplete session gets the configured floor instead.
fn speed_score(timing: &TimingResult, timeout: Duration, config: &ScoringConfig) -> f64 {
    if timing.timed_out || !timing.completed {
        return clamp(config.incomplete_floor);
    }

    let timeout_millis = (timeout.as_millis() as f64).max(1.0);
    let fraction = (timing.total_millis as f64 / timeout_millis).clamp(0.0, 1.0);
    clamp(100.0 * (1.0 - fraction))
}

fn architecture_score(summary: &AnalysisSummary, config: &ScoringConfig) -> f64 {
    let base = match summary.architecture {
        ArchitectureKind::Oop => 100.0,
        ArchitectureKind::Functional => 80.0,
        ArchitectureKind::Scripting => 40.0,
    };

    let over_threshold = (summary.complexity_score - config.complexity_threshold).max(0.0);
    let complexity_penalty = over_threshold * config.complexity_penalty;
    let style_penalty = summary.style_violations as f64 * config.style_penalty;

    clamp(base - complexity_penalty - style_penalty)
}

fn error_score(summary: &AnalysisSummary, config: &ScoringConfig) -> f64 {
    // Code that does not execute at all scores zero. A hard override, not
    // a large penalty.
    if !summary.runtime_ok {
        return 0.0;
    }

    let occurrences = (summary.error_count + summary.retry_count) as f64;
    clamp(100.0 - occurrences * config.error_penalty)
}

fn library_score(summary: &AnalysisSummary, config: &ScoringConfig) -> f64 {
    let mut score = 100.0;

    score -= summary.unused_imports.len() as f64 * config.unused_import_penalty;

    for import in &summary.imports {
        if summary.unused_imports.contains(import) {
            continue;
        }
        if !is_standard(import, &config.standard_libraries) {
            score -= config.third_party_penalty;
        }
    }

    clamp(score)
}

/// An import counts as standard when its top-level module is in the
/// designated set ("os.path" matches "os").
fn is_standard(import: &str, standard: &[String]) -> bool {
    let top_level = import.split('.').next().unwrap_or(import);
    standard.iter().any(|s| s == top_level)
}

fn clamp(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_timing(total_millis: u64) -> TimingResult {
        TimingResult {
            thinking_millis: total_millis / 2,
            writing_millis: total_millis - total_millis / 2,
            total_millis,
            completed: true,
            timed_out: false,
            last_write_millis: None,
        }
    }

    fn timed_out_timing() -> TimingResult {
        TimingResult {
            thinking_millis: 600_000,
            writing_millis: 0,
            total_millis: 600_000,
            completed: false,
            timed_out: true,
            last_write_millis: None,
        }
    }

    fn clean_summary(architecture: ArchitectureKind) -> AnalysisSummary {
        AnalysisSummary {
            architecture,
            complexity_score: 30.0,
            style_violations: 0,
            imports: vec!["os".to_string(), "json".to_string()],
            unused_imports: Vec::new(),
            error_count: 0,
            retry_count: 0,
            runtime_ok: true,
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(600);

    fn default_config() -> ScoringConfig {
        ScoringConfig::default()
    }

    // =========================================================================
    // Determinism and totality
    // =========================================================================

    #[test]
    fn test_identical_inputs_yield_identical_breakdowns() {
        let config = default_config();
        let timing = completed_timing(4500);
        let summary = clean_summary(ArchitectureKind::Oop);

        let a = score_session(&timing, TIMEOUT, Some(&summary), &config);
        let b = score_session(&timing, TIMEOUT, Some(&summary), &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_sub_score_stays_in_bounds() {
        let config = default_config();
        let summary = AnalysisSummary {
            architecture: ArchitectureKind::Scripting,
            complexity_score: 10_000.0,
            style_violations: 999,
            imports: (0..200).map(|i| format!("pkg{i}")).collect(),
            unused_imports: (0..200).map(|i| format!("pkg{i}")).collect(),
            error_count: 1000,
            retry_count: 1000,
            runtime_ok: true,
        };
        let breakdown = score_session(&timed_out_timing(), TIMEOUT, Some(&summary), &config);

        for score in [
            breakdown.speed,
            breakdown.architecture,
            breakdown.error,
            breakdown.library,
            breakdown.total,
        ] {
            assert!((0.0..=100.0).contains(&score), "out of range: {score}");
        }
    }

    #[test]
    fn test_missing_analysis_substitutes_documented_defaults() {
        let config = default_config();
        let breakdown = score_session(&completed_timing(4500), TIMEOUT, None, &config);
        assert_eq!(breakdown.architecture, MISSING_ARCHITECTURE_SCORE);
        assert_eq!(breakdown.error, MISSING_ERROR_SCORE);
        assert_eq!(breakdown.library, MISSING_LIBRARY_SCORE);
        assert!(breakdown.total > 0.0);
    }

    // =========================================================================
    // Speed
    // =========================================================================

    #[test]
    fn test_faster_completed_session_scores_higher() {
        let config = default_config();
        let fast = score_session(&completed_timing(4500), TIMEOUT, None, &config);
        let slow = score_session(&completed_timing(90_000), TIMEOUT, None, &config);
        assert!(fast.speed > slow.speed);
    }

    #[test]
    fn test_timed_out_session_gets_the_floor_not_zero() {
        let config = default_config();
        let breakdown = score_session(&timed_out_timing(), TIMEOUT, None, &config);
        assert_eq!(breakdown.speed, config.incomplete_floor);
    }

    #[test]
    fn test_incomplete_session_gets_the_floor() {
        let config = default_config();
        let timing = TimingResult {
            thinking_millis: 3000,
            writing_millis: 0,
            total_millis: 3000,
            completed: false,
            timed_out: false,
            last_write_millis: None,
        };
        let breakdown = score_session(&timing, TIMEOUT, None, &config);
        assert_eq!(breakdown.speed, config.incomplete_floor);
    }

    #[test]
    fn test_floor_is_tunable() {
        let config = ScoringConfig {
            incomplete_floor: 0.0,
            ..Default::default()
        };
        let breakdown = score_session(&timed_out_timing(), TIMEOUT, None, &config);
        assert_eq!(breakdown.speed, 0.0);
    }

    // =========================================================================
    // Architecture
    // =========================================================================

    #[test]
    fn test_clean_oop_scores_exactly_100() {
        let config = default_config();
        let summary = clean_summary(ArchitectureKind::Oop);
        let breakdown = score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.architecture, 100.0);
    }

    #[test]
    fn test_architecture_base_lookup() {
        let config = default_config();
        let timing = completed_timing(4500);

        let functional = clean_summary(ArchitectureKind::Functional);
        let scripting = clean_summary(ArchitectureKind::Scripting);
        assert_eq!(
            score_session(&timing, TIMEOUT, Some(&functional), &config).architecture,
            80.0
        );
        assert_eq!(
            score_session(&timing, TIMEOUT, Some(&scripting), &config).architecture,
            40.0
        );
    }

    #[test]
    fn test_complexity_over_threshold_is_penalized() {
        let config = default_config();
        let mut summary = clean_summary(ArchitectureKind::Oop);
        summary.complexity_score = config.complexity_threshold + 20.0;

        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.architecture, 100.0 - 20.0 * config.complexity_penalty);
    }

    #[test]
    fn test_style_violations_are_penalized() {
        let config = default_config();
        let mut summary = clean_summary(ArchitectureKind::Oop);
        summary.style_violations = 5;

        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.architecture, 100.0 - 5.0 * config.style_penalty);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_errors_and_retries_each_cost_the_penalty() {
        // Two errors and one retry at 10 points each: 100 - 30 = 70.
        let config = default_config();
        let mut summary = clean_summary(ArchitectureKind::Oop);
        summary.error_count = 2;
        summary.retry_count = 1;

        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.error, 70.0);
    }

    #[test]
    fn test_non_executing_code_scores_zero_regardless_of_counts() {
        let config = default_config();
        let mut summary = clean_summary(ArchitectureKind::Oop);
        summary.runtime_ok = false;

        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.error, 0.0);
    }

    // =========================================================================
    // Libraries
    // =========================================================================

    #[test]
    fn test_standard_imports_are_not_penalized() {
        let config = default_config();
        let summary = clean_summary(ArchitectureKind::Oop);
        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.library, 100.0);
    }

    #[test]
    fn test_unused_imports_are_penalized() {
        let config = default_config();
        let mut summary = clean_summary(ArchitectureKind::Oop);
        summary.imports = vec!["os".to_string(), "requests".to_string()];
        summary.unused_imports = vec!["requests".to_string()];

        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.library, 100.0 - config.unused_import_penalty);
    }

    #[test]
    fn test_used_third_party_import_costs_less_than_unused() {
        let config = default_config();
        let mut summary = clean_summary(ArchitectureKind::Oop);
        summary.imports = vec!["requests".to_string()];

        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.library, 100.0 - config.third_party_penalty);
        assert!(config.third_party_penalty < config.unused_import_penalty);
    }

    #[test]
    fn test_dotted_standard_import_matches_top_level_module() {
        let config = default_config();
        let mut summary = clean_summary(ArchitectureKind::Oop);
        summary.imports = vec!["os.path".to_string()];

        let breakdown =
            score_session(&completed_timing(4500), TIMEOUT, Some(&summary), &config);
        assert_eq!(breakdown.library, 100.0);
    }

    // =========================================================================
    // Total
    // =========================================================================

    #[test]
    fn test_total_is_the_weighted_sum() {
        let config = default_config();
        let summary = clean_summary(ArchitectureKind::Oop);
        let timing = completed_timing(4500);
        let breakdown = score_session(&timing, TIMEOUT, Some(&summary), &config);

        let expected = breakdown.speed * config.weight_speed
            + breakdown.architecture * config.weight_architecture
            + breakdown.error * config.weight_error
            + breakdown.library * config.weight_library;
        assert!((breakdown.total - expected).abs() < 1e-9);
    }
}
