//! Error types for JALKI pipeline stages

use thiserror::Error;

/// Error produced by a stage while processing an envelope
///
/// A stage error terminates its chain: it is delivered downstream as an
/// error signal (hooks still run for it) and no further items are processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A stage failed to process an item
    #[error("stage '{stage}' failed: {message}")]
    Failed {
        /// Name of the failing stage
        stage: &'static str,
        /// Human-readable cause
        message: String,
    },
}

impl StageError {
    /// Convenience constructor for [`StageError::Failed`]
    pub fn failed(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            message: message.into(),
        }
    }
}
