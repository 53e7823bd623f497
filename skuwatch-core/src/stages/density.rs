//! Volume and density proxies on a log scale.

use super::{
    EPSILON, FeatureStage, HEIGHT_COL, LENGTH_COL, WEIGHT_COL, WIDTH_COL, ensure_fitted,
    numeric_column,
};
use crate::batch::{Cell, DataBatch};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

const NAME: &str = "log_density_volume";

/// Emits `log1p(volume + ε)`, `log1p(density + ε)`, `log1p(weight + ε)` and
/// the raw density, where `volume = L·W·H` and `density = weight / (volume + ε)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogDensityVolume {
    pub weight_col: String,
    pub dim_cols: [String; 3],
    pub log_volume_col: String,
    pub log_density_col: String,
    pub density_col: String,
    pub log_weight_col: String,
    pub fitted: bool,
}

impl Default for LogDensityVolume {
    fn default() -> Self {
        Self {
            weight_col: WEIGHT_COL.into(),
            dim_cols: [LENGTH_COL.into(), WIDTH_COL.into(), HEIGHT_COL.into()],
            log_volume_col: "log_volume".into(),
            log_density_col: "log_density_proxy".into(),
            density_col: "density_proxy".into(),
            log_weight_col: "log_final_weight".into(),
            fitted: false,
        }
    }
}

impl FeatureStage for LogDensityVolume {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, _batch: &DataBatch, _target: Option<&[f64]>) -> Result<(), PipelineError> {
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut batch: DataBatch) -> Result<DataBatch, PipelineError> {
        ensure_fitted(self)?;
        let [l, w, h] = &self.dim_cols;
        let length = numeric_column(&batch, NAME, l)?;
        let width = numeric_column(&batch, NAME, w)?;
        let height = numeric_column(&batch, NAME, h)?;
        let weight = numeric_column(&batch, NAME, &self.weight_col)?;

        let rows = batch.row_count();
        let mut log_volume = Vec::with_capacity(rows);
        let mut log_density = Vec::with_capacity(rows);
        let mut log_weight = Vec::with_capacity(rows);
        let mut density = Vec::with_capacity(rows);

        for i in 0..rows {
            let volume = match (length[i], width[i], height[i]) {
                (Some(l), Some(w), Some(h)) => Some(l * w * h),
                _ => None,
            };
            let dens = match (weight[i], volume) {
                (Some(wt), Some(v)) => Some(wt / (v + EPSILON)),
                _ => None,
            };
            log_volume.push(Cell::from_opt(volume.map(|v| (v + EPSILON).ln_1p())));
            log_density.push(Cell::from_opt(dens.map(|d| (d + EPSILON).ln_1p())));
            log_weight.push(Cell::from_opt(weight[i].map(|wt| (wt + EPSILON).ln_1p())));
            density.push(Cell::from_opt(dens));
        }

        batch.set_column(self.log_volume_col.clone(), log_volume)?;
        batch.set_column(self.log_density_col.clone(), log_density)?;
        batch.set_column(self.log_weight_col.clone(), log_weight)?;
        batch.set_column(self.density_col.clone(), density)?;
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

    fn record(l: f64, w: f64, h: f64, weight: f64) -> DataBatch {
        DataBatch::from_record([
            ("Length", Cell::Float(l)),
            ("Width", Cell::Float(w)),
            ("Height", Cell::Float(h)),
            ("Final Weights in Grams", Cell::Float(weight)),
        ])
        .unwrap()
    }

    fn value(batch: &DataBatch, column: &str) -> f64 {
        batch.get(0, column).and_then(Cell::as_f64).unwrap()
    }

    #[test]
    fn test_reference_record() {
        let out = fitted(LogDensityVolume::default())
            .transform(record(10.0, 5.0, 2.0, 100.0))
            .unwrap();
        assert!((value(&out, "density_proxy") - 1.0).abs() < 1e-6);
        assert!((value(&out, "log_volume") - 100f64.ln_1p()).abs() < 1e-6);
        assert!((value(&out, "log_final_weight") - 100f64.ln_1p()).abs() < 1e-6);
        assert!((value(&out, "log_density_proxy") - 1f64.ln_1p()).abs() < 1e-6);
    }

    #[test]
    fn test_output_column_order() {
        let out = fitted(LogDensityVolume::default())
            .transform(record(1.0, 1.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(
            &out.columns()[4..],
            [
                "log_volume",
                "log_density_proxy",
                "log_final_weight",
                "density_proxy"
            ]
        );
    }

    #[test]
    fn test_zero_dimensions_stay_finite() {
        let out = fitted(LogDensityVolume::default())
            .transform(record(0.0, 0.0, 0.0, 0.0))
            .unwrap();
        for column in [
            "log_volume",
            "log_density_proxy",
            "log_final_weight",
            "density_proxy",
        ] {
            assert!(value(&out, column).is_finite(), "{column} not finite");
        }
    }

    #[test]
    fn test_missing_dimension_fails_fast() {
        let batch = DataBatch::from_record([("Length", Cell::Float(1.0))]).unwrap();
        let err = fitted(LogDensityVolume::default()).transform(batch).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn test_null_weight_propagates() {
        let mut batch = record(1.0, 2.0, 3.0, 0.0);
        batch
            .set_column("Final Weights in Grams", vec![Cell::Null])
            .unwrap();
        let out = fitted(LogDensityVolume::default()).transform(batch).unwrap();
        assert_eq!(out.get(0, "density_proxy"), Some(&Cell::Null));
        assert!(value(&out, "log_volume") > 0.0);
    }
}
