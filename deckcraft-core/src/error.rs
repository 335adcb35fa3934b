//! Fatal pipeline errors

use thiserror::Error;

/// Whole-run failures surfaced to the caller.
///
/// Everything recoverable (missing headers, malformed cells, unparseable
/// colors, absent template shapes) is absorbed where it happens; only an
/// input stream that cannot be opened at all aborts a run, and it does so
/// before any output bytes exist.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("workbook stream could not be opened: {reason}")]
    WorkbookUnreadable { reason: String },

    #[error("template deck could not be opened: {reason}")]
    TemplateUnreadable { reason: String },
}

impl PipelineError {
    pub fn workbook(err: impl std::fmt::Display) -> Self {
        PipelineError::WorkbookUnreadable {
            reason: err.to_string(),
        }
    }

    pub fn template(err: impl std::fmt::Display) -> Self {
        PipelineError::TemplateUnreadable {
            reason: err.to_string(),
        }
    }
}
