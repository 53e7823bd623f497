//! Pairwise dimension ratios.

use super::{
    EPSILON, FeatureStage, HEIGHT_COL, LENGTH_COL, WIDTH_COL, ensure_fitted, numeric_column,
    zip_with,
};
use crate::batch::DataBatch;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

const NAME: &str = "aspect_ratio";

/// Emits `L_by_W`, `L_by_H` and `W_by_H`, each denominator guarded by `epsilon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectRatio {
    pub length_col: String,
    pub width_col: String,
    pub height_col: String,
    pub epsilon: f64,
    pub fitted: bool,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            length_col: LENGTH_COL.into(),
            width_col: WIDTH_COL.into(),
            height_col: HEIGHT_COL.into(),
            epsilon: EPSILON,
            fitted: false,
        }
    }
}

impl FeatureStage for AspectRatio {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, _batch: &DataBatch, _target: Option<&[f64]>) -> Result<(), PipelineError> {
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut batch: DataBatch) -> Result<DataBatch, PipelineError> {
        ensure_fitted(self)?;
        let length = numeric_column(&batch, NAME, &self.length_col)?;
        let width = numeric_column(&batch, NAME, &self.width_col)?;
        let height = numeric_column(&batch, NAME, &self.height_col)?;
        let eps = self.epsilon;

        batch.set_column("L_by_W", zip_with(&length, &width, |a, b| a / (b + eps)))?;
        batch.set_column("L_by_H", zip_with(&length, &height, |a, b| a / (b + eps)))?;
        batch.set_column("W_by_H", zip_with(&width, &height, |a, b| a / (b + eps)))?;
        Ok(batch)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn mark_fitted(&mut self) {
        self.fitted = true;
    }
}
