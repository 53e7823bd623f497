//! Single-record prediction: rename, replay, align, classify.

use crate::align::{align_features, feature_matrix};
use crate::artifact::ModelArtifact;
use crate::batch::{Cell, DataBatch};
use crate::error::{ArtifactError, ModelError, PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API field names that differ from the training-time column names.
pub const FIELD_RENAMES: [(&str, &str); 3] = [
    ("Count_Category", "Count Category"),
    ("Price_In_Dollar", "Price In Dollar"),
    ("Final_Weights_in_Grams", "Final Weights in Grams"),
];

/// A product record as accepted by `/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(rename = "Count_Category")]
    pub count_category: i64,
    #[serde(rename = "Price_In_Dollar")]
    pub price_in_dollar: f64,
    #[serde(rename = "Length")]
    pub length: f64,
    #[serde(rename = "Width")]
    pub width: f64,
    #[serde(rename = "Height")]
    pub height: f64,
    #[serde(rename = "Final_Weights_in_Grams")]
    pub final_weights_in_grams: f64,
    #[serde(rename = "Hierarchy")]
    pub hierarchy: String,
}

impl ProductInput {
    /// One-row batch keyed by the API field names.
    fn to_api_batch(&self) -> std::result::Result<DataBatch, PipelineError> {
        DataBatch::from_record([
            ("Count_Category", Cell::Int(self.count_category)),
            ("Price_In_Dollar", Cell::from_f64(self.price_in_dollar)),
            ("Length", Cell::from_f64(self.length)),
            ("Width", Cell::from_f64(self.width)),
            ("Height", Cell::from_f64(self.height)),
            (
                "Final_Weights_in_Grams",
                Cell::from_f64(self.final_weights_in_grams),
            ),
            ("Hierarchy", Cell::Text(self.hierarchy.clone())),
        ])
    }

    /// One-row batch keyed by the training-time column names.
    pub fn to_batch(&self) -> std::result::Result<DataBatch, PipelineError> {
        let mut batch = self.to_api_batch()?;
        rename_api_fields(&mut batch)?;
        Ok(batch)
    }
}

/// Apply [`FIELD_RENAMES`] in place. Fields not in the map pass through.
pub fn rename_api_fields(batch: &mut DataBatch) -> std::result::Result<(), PipelineError> {
    for (api, training) in FIELD_RENAMES {
        batch.rename_column(api, training)?;
    }
    Ok(())
}

/// Response of `/predict`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: i64,
    pub confidence: f64,
}

/// Drives the artifact for one record at a time.
///
/// Cheap to clone; all clones share the same read-only artifact.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: Arc<ModelArtifact>,
}

impl Predictor {
    /// Wrap an artifact, re-checking it first: an artifact built by hand or
    /// deserialized directly may never have been validated.
    pub fn new(artifact: Arc<ModelArtifact>) -> std::result::Result<Self, ArtifactError> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Aligned single-row feature batch for `input`.
    pub fn features(&self, input: &ProductInput) -> Result<DataBatch> {
        let batch = input.to_batch()?;
        let transformed = self.artifact.pipeline.transform(batch)?;
        Ok(align_features(&transformed, &self.artifact.feature_columns))
    }

    pub fn predict(&self, input: &ProductInput) -> Result<Prediction> {
        let aligned = self.features(input)?;
        let matrix = feature_matrix(&aligned)?;
        let row = matrix.first().ok_or(ModelError::FeatureCount {
            expected: self.artifact.feature_columns.len(),
            actual: 0,
        })?;
        let (prediction, confidence) = self.artifact.model.predict_with_confidence(row)?;
        tracing::debug!(
            hierarchy = %input.hierarchy,
            prediction,
            confidence,
            "Scored product record"
        );
        Ok(Prediction {
            prediction,
            confidence,
        })
    }
}
