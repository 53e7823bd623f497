//! Error types for the SkuWatch core library.
//!
//! Uses `thiserror` for structured variants covering the feature pipeline,
//! the classifier and artifact loading.

use std::path::PathBuf;

/// Top-level error type for the SkuWatch core library.
#[derive(Debug, thiserror::Error)]
pub enum SkuwatchError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Errors raised while fitting or replaying feature stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Stage '{stage}' requires column '{column}' which is not in the batch")]
    MissingColumn { stage: String, column: String },

    #[error("Stage '{stage}' has not been fitted")]
    NotFitted { stage: String },

    #[error("Stage '{stage}' expected numeric values in column '{column}'")]
    NonNumeric { stage: String, column: String },

    #[error("Column '{column}' has {actual} values but the batch has {expected} rows")]
    ShapeMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column '{column}'")]
    DuplicateColumn { column: String },

    #[error("Feature column '{column}' is null after alignment")]
    NullFeature { column: String },
}

/// Errors from the fitted classifier.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Classifier has no class labels")]
    NoClasses,

    #[error("Feature vector has {actual} values, classifier expects {expected}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Tree {index} is malformed: {reason}")]
    InvalidTree { index: usize, reason: String },

    #[error("Invalid classifier: {reason}")]
    Invalid { reason: String },

    #[error("Classifier output is not a probability: {reason}")]
    NonFinite { reason: String },
}

/// Errors from loading or saving the model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Artifact is inconsistent: {reason}")]
    Invalid { reason: String },

    #[error("Artifact serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ArtifactError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

impl From<ModelError> for ArtifactError {
    fn from(err: ModelError) -> Self {
        Self::invalid(err.to_string())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, SkuwatchError>;
