use serde::{Deserialize, Serialize};

/// Derived timing measurements for one session.
///
/// `thinking_millis` runs from session start to signal creation,
/// `writing_millis` from signal creation to signal deletion. Once computed
/// the struct is never mutated; `total_millis` always equals the sum of the
/// two phases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingResult {
    pub thinking_millis: u64,
    pub writing_millis: u64,
    pub total_millis: u64,
    /// True only when the signal artifact was created and then deleted.
    pub completed: bool,
    pub timed_out: bool,
    /// Last observed write to the target source file, for diagnostics only;
    /// signal deletion is the authoritative end-of-task marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_write_millis: Option<u64>,
}

impl TimingResult {
    pub fn total_seconds(&self) -> f64 {
        self.total_millis as f64 / 1000.0
    }
}
