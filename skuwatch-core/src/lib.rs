//! # SkuWatch Core
//!
//! Replays a fitted feature pipeline over product records and scores them
//! with a fitted classifier.
//!
//! The flow for one record is: rename API fields to training-time column
//! names, run the [`Pipeline`] with its frozen statistics, align the output
//! to the classifier's feature columns, then take the most probable class.
//! Everything the replay needs lives in a [`ModelArtifact`] loaded once at
//! startup and shared read-only.

pub mod align;
pub mod artifact;
pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod predictor;
pub mod stages;

// Re-export commonly used types at the crate root.
pub use align::{align_features, feature_matrix};
pub use artifact::{ArtifactMetadata, ArtifactSummary, ModelArtifact, StageSummary};
pub use batch::{Cell, DataBatch};
pub use config::{ConfigOverrides, SkuwatchConfig, load_config};
pub use error::{ArtifactError, ModelError, PipelineError, Result, SkuwatchError};
pub use model::{Classifier, DecisionTree};
pub use pipeline::{Pipeline, PipelineStep};
pub use predictor::{FIELD_RENAMES, Prediction, Predictor, ProductInput};
pub use stages::{FeatureStage, Stage};
