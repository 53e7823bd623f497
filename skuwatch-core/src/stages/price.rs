//! Price per gram.

use super::{
    EPSILON, FeatureStage, PRICE_COL, WEIGHT_COL, ensure_fitted, numeric_column, zip_with,
};
use crate::batch::DataBatch;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

const NAME: &str = "price_per_gram";

/// Emits `price / (weight + ε)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricePerGram {
    pub price_col: String,
    pub weight_col: String,
    pub output_col: String,
    pub fitted: bool,
}

impl Default for PricePerGram {
    fn default() -> Self {
        Self {
            price_col: PRICE_COL.into(),
            weight_col: WEIGHT_COL.into(),
            output_col: "price_per_gram".into(),
            fitted: false,
        }
    }
}

impl FeatureStage for PricePerGram {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, _batch: &DataBatch, _target: Option<&[f64]>) -> Result<(), PipelineError> {
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut batch: DataBatch) -> Result<DataBatch, PipelineError> {
        ensure_fitted(self)?;
        let price = numeric_column(&batch, NAME, &self.price_col)?;
        let weight = numeric_column(&batch, NAME, &self.weight_col)?;
        let ratio = zip_with(&price, &weight, |p, w| p / (w + EPSILON));
        batch.set_column(self.output_col.clone(), ratio)?;
        Ok(batch)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn mark_fitted(&mut self) {
        self.fitted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fitted;
    use crate::batch::Cell;

    #[test]
    fn test_price_per_gram() {
        let batch = DataBatch::from_record([
            ("Price In Dollar", Cell::Float(25.0)),
            ("Final Weights in Grams", Cell::Float(100.0)),
        ])
        .unwrap();
        let out = fitted(PricePerGram::default()).transform(batch).unwrap();
        let ppg = out.get(0, "price_per_gram").and_then(Cell::as_f64).unwrap();
        assert!((ppg - 0.25).abs() < 1e-8);
    }

    #[test]
    fn test_zero_weight_is_guarded() {
        let batch = DataBatch::from_record([
            ("Price In Dollar", Cell::Int(3)),
            ("Final Weights in Grams", Cell::Int(0)),
        ])
        .unwrap();
        let out = fitted(PricePerGram::default()).transform(batch).unwrap();
        let ppg = out.get(0, "price_per_gram").and_then(Cell::as_f64).unwrap();
        assert!(ppg.is_finite());
        assert!((ppg - 3.0e6).abs() < 1e-3);
    }

    #[test]
    fn test_missing_price_column() {
        let batch = DataBatch::from_record([("Final Weights in Grams", Cell::Float(1.0))]).unwrap();
        let err = fitted(PricePerGram::default()).transform(batch).unwrap_err();
        assert!(err.to_string().contains("Price In Dollar"));
    }
}
