//! Error kinds raised by the inference pipeline.
//!
//! Every stage returns `Result<_, PipelineError>`. Degrading an error into
//! an empty finding list is left to the outermost adapter (the CLI), so the
//! distinction between "no smells" and "pipeline failed" survives up to
//! that boundary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifacts::ArtifactKind;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The external extractor could not be launched or exited non-zero.
    #[error("metrics extraction failed: {detail}")]
    ExtractionFailure {
        detail: String,
        stderr: Option<String>,
    },

    /// The external extractor exceeded its runtime budget and was killed.
    #[error("metrics extraction timed out after {timeout_secs}s")]
    ExtractionTimeout { timeout_secs: u64 },

    /// An artifact file for the category is absent or not deserializable.
    #[error("artifact `{artifact}` for category `{category}` unavailable at {}: {reason}", path.display())]
    ArtifactMissing {
        category: String,
        artifact: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    /// The metrics extract is absent, empty or not rectangular.
    #[error("cannot ingest metrics from {}: {reason}", path.display())]
    IngestFailure { path: PathBuf, reason: String },

    /// Columns required by the artifacts are absent from the metrics table.
    #[error("metrics table is missing required features: {}", missing.join(", "))]
    MissingFeatures { missing: Vec<String> },

    /// Shape or type mismatch between training-time artifacts and the
    /// inference data. Indicates a defect, not a data-quality issue.
    #[error("inference error: {detail}")]
    InferenceError { detail: String },

    #[error("invalid smell category `{0}`")]
    InvalidCategory(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExtractionFailure { .. } => ErrorKind::ExtractionFailure,
            Self::ExtractionTimeout { .. } => ErrorKind::ExtractionTimeout,
            Self::ArtifactMissing { .. } => ErrorKind::ArtifactMissing,
            Self::IngestFailure { .. } => ErrorKind::IngestFailure,
            Self::MissingFeatures { .. } => ErrorKind::MissingFeatures,
            Self::InferenceError { .. } => ErrorKind::InferenceError,
            Self::InvalidCategory(_) => ErrorKind::InvalidCategory,
        }
    }

    pub(crate) fn inference(detail: impl Into<String>) -> Self {
        Self::InferenceError {
            detail: detail.into(),
        }
    }

    pub(crate) fn ingest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::IngestFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Fieldless tag of a [`PipelineError`], used in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExtractionFailure,
    ExtractionTimeout,
    ArtifactMissing,
    IngestFailure,
    MissingFeatures,
    InferenceError,
    InvalidCategory,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ExtractionFailure => "extraction_failure",
            Self::ExtractionTimeout => "extraction_timeout",
            Self::ArtifactMissing => "artifact_missing",
            Self::IngestFailure => "ingest_failure",
            Self::MissingFeatures => "missing_features",
            Self::InferenceError => "inference_error",
            Self::InvalidCategory => "invalid_category",
        };
        f.write_str(s)
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
