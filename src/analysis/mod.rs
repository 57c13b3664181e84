//! Analyzer input contract.
//!
//! Static analysis (complexity, style, imports, runtime validation) is
//! owned by external collaborators; the core only consumes their summary.
//! [`AnalysisProvider`] is the seam: the default implementation reads the
//! summary the analyzer drops into the workspace, and anything from an AST
//! walker to a linter pipeline can be plugged in behind the same trait.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ANALYSIS_FILE;
use crate::error::AnalysisError;
use crate::models::analysis::AnalysisSummary;

pub trait AnalysisProvider {
    /// Produce the analysis summary for one workspace.
    ///
    /// `Unavailable` is non-fatal: the scoring engine substitutes its
    /// documented defaults and the session still yields a score.
    fn analyze(&self, workspace: &Path) -> Result<AnalysisSummary, AnalysisError>;
}

/// Reads the JSON summary an external analyzer leaves in the workspace.
pub struct JsonFileProvider {
    file_name: String,
}

impl JsonFileProvider {
    pub fn new() -> Self {
        Self {
            file_name: ANALYSIS_FILE.to_string(),
        }
    }

    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    fn path_in(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.file_name)
    }
}

impl Default for JsonFileProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisProvider for JsonFileProvider {
    fn analyze(&self, workspace: &Path) -> Result<AnalysisSummary, AnalysisError> {
        let path = self.path_in(workspace);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no analysis output present");
                return Err(AnalysisError::Unavailable { path });
            }
            Err(err) => {
                return Err(AnalysisError::Malformed {
                    path,
                    message: err.to_string(),
                })
            }
        };

        serde_json::from_str(&content).map_err(|err| AnalysisError::Malformed {
            path,
            message: err.to_string(),
        })
    }
}
