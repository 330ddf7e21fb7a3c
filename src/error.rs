//! Error taxonomy for the ML subsystem.
//!
//! The prediction path never surfaces these to callers: a failing classifier
//! is skipped, a fully failed ensemble returns `available: false` with a
//! neutral confidence. Typed errors exist for the training path and for
//! persistence, where the caller needs to distinguish "not enough data"
//! (expected, retry later) from a genuine failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MlError {
    /// Fewer verified training rows than the minimum sample threshold.
    /// Returned, not panicked; the scheduler just tries again later.
    #[error("insufficient training data for {category}: {available} verified rows, need {required}")]
    DataUnavailable {
        category: String,
        available: usize,
        required: usize,
    },

    /// No persisted artifact for a classifier kind. The ensemble skips the
    /// kind and keeps voting with whatever is available.
    #[error("no model artifact for {kind} / {category}")]
    ModelUnavailable { kind: String, category: String },

    /// A single classifier failed at inference time. Skipped, non-fatal.
    #[error("classifier {kind} failed to predict: {reason}")]
    PredictionFailure { kind: String, reason: String },

    /// One classifier's fit/evaluate failed. Isolated per kind; the other
    /// kinds still train and publish.
    #[error("training {kind} for {category} failed: {reason}")]
    TrainingFailure {
        kind: String,
        category: String,
        reason: String,
    },

    /// An artifact or aggregate write failed. Logged; the caller's flow
    /// continues and the specific row may be lost (accepted soft failure).
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl MlError {
    /// True when the error means "come back with more data", not "broken".
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, MlError::DataUnavailable { .. })
    }
}
