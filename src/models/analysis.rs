use serde::{Deserialize, Serialize};

/// Overall shape of the code the agent produced, as judged by the external
/// analyzer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureKind {
    Oop,
    Functional,
    Scripting,
}

impl std::fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchitectureKind::Oop => write!(f, "OOP"),
            ArchitectureKind::Functional => write!(f, "Functional"),
            ArchitectureKind::Scripting => write!(f, "Scripting"),
        }
    }
}

/// Static-analysis summary supplied per session by external collaborators.
///
/// The analyzer owns the algorithms and thresholds behind these numbers; the
/// scoring engine treats the summary as an immutable input. Fields the
/// analyzer does not know (typically `error_count` and `retry_count`, which
/// come from watch telemetry) default to zero and are folded in by the
/// orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSummary {
    pub architecture: ArchitectureKind,
    pub complexity_score: f64,
    #[serde(default)]
    pub style_violations: u32,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub unused_imports: Vec<String>,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub retry_count: u32,
    /// Whether the produced program executes at all.
    #[serde(default = "default_runtime_ok")]
    pub runtime_ok: bool,
}

fn default_runtime_ok() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_minimal_summary() {
        let summary: AnalysisSummary = serde_json::from_str(
            r#"{"architecture": "oop", "complexity_score": 42.0}"#,
        )
        .unwrap();
        assert_eq!(summary.architecture, ArchitectureKind::Oop);
        assert_eq!(summary.style_violations, 0);
        assert!(summary.imports.is_empty());
        assert!(summary.runtime_ok);
    }

    #[test]
    fn test_deserializes_full_summary() {
        let summary: AnalysisSummary = serde_json::from_str(
            r#"{
                "architecture": "functional",
                "complexity_score": 71.5,
                "style_violations": 3,
                "imports": ["os", "requests"],
                "unused_imports": ["requests"],
                "error_count": 1,
                "retry_count": 2,
                "runtime_ok": false
            }"#,
        )
        .unwrap();
        assert_eq!(summary.architecture, ArchitectureKind::Functional);
        assert_eq!(summary.unused_imports, vec!["requests".to_string()]);
        assert!(!summary.runtime_ok);
    }

    #[test]
    fn test_architecture_display() {
        assert_eq!(ArchitectureKind::Oop.to_string(), "OOP");
        assert_eq!(ArchitectureKind::Scripting.to_string(), "Scripting");
    }
}
