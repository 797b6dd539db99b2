//! Error types for quality-gate evaluation

use thiserror::Error;

/// Quality-gate error enumeration
#[derive(Debug, Error)]
pub enum QualityError {
    /// Malformed gate policy on registration or config load
    #[error("invalid gate policy: {0}")]
    Configuration(String),

    /// Failure during a single evaluation (resolver or internal)
    #[error("quality evaluation failed: {0}")]
    Evaluation(String),

    /// Adaptive evaluation invoked with no history samples
    #[error("adaptive evaluation requires a non-empty performance history")]
    EmptyHistory,
}

impl QualityError {
    /// Check if the error originated from caller-supplied configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, QualityError::Configuration(_))
    }
}
