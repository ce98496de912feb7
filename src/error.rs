//! Error types for the career advisor.
//!
//! Library code returns [`AdvisorError`]; the binary wraps it in `anyhow`
//! at the edge.

use thiserror::Error;

/// Errors raised while building a quiz, collecting answers, or predicting.
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// The classifier bundle is missing or malformed. Fatal at startup.
    #[error("Startup failure: {0}")]
    StartupFailure(String),

    /// No classifier could be obtained for prediction.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Navigation or recording attempted out of sequence.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Scoring attempted before every question was answered.
    #[error("Incomplete input: question {position} has no answer")]
    IncompleteInput {
        /// Zero-based position of the first unanswered question.
        position: usize,
    },

    /// The classifier rejected the feature vector.
    #[error("Prediction error: {0}")]
    PredictionError(String),

    /// The response options do not form a valid weight mapping.
    #[error("Invalid response scale: {0}")]
    InvalidScale(String),
}

impl AdvisorError {
    pub fn startup(msg: impl Into<String>) -> Self {
        Self::StartupFailure(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn prediction(msg: impl Into<String>) -> Self {
        Self::PredictionError(msg.into())
    }

    pub fn invalid_scale(msg: impl Into<String>) -> Self {
        Self::InvalidScale(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AdvisorError>;
