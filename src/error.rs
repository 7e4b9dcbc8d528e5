use std::path::PathBuf;

use thiserror::Error;

/// Conditions the pipeline reports. Only `PersistenceFailure` and
/// `InvalidSelector` abort a run; the rest degrade to empty results or
/// skipped steps and are surfaced as warnings.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("cannot decode {} as {encoding}", .path.display())]
    Decode { path: PathBuf, encoding: String },

    #[error("unexpected document structure: {0}")]
    StructuralParseFailure(String),

    #[error("expected column '{0}' not found, filter skipped")]
    MissingExpectedColumn(String),

    #[error("ledger unavailable at {}: {reason}", .path.display())]
    LedgerUnavailable { path: PathBuf, reason: String },

    #[error("failed to persist {}: {reason}", .path.display())]
    PersistenceFailure { path: PathBuf, reason: String },

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl PipelineError {
    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn ledger_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LedgerUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for conditions that must stop the run instead of degrading.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PersistenceFailure { .. } | Self::InvalidSelector { .. }
        )
    }
}
