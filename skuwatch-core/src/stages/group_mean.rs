//! Difference between a value and its group's training-time mean.

use super::{CATEGORY_COL, FeatureStage, PRICE_COL, key_column, numeric_column};
use crate::batch::{Cell, DataBatch};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NAME: &str = "group_mean_difference";

/// Emits `value - group_mean[key]`.
///
/// Keys unseen at fit time, null keys and null values all produce `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMeanDifference {
    pub group_col: String,
    pub value_col: String,
    /// Defaults to `{value_col}_diff_from_group_mean`.
    pub output_col: Option<String>,
    pub group_means: BTreeMap<String, f64>,
    pub fitted: bool,
}

impl Default for GroupMeanDifference {
    fn default() -> Self {
        Self::new(CATEGORY_COL, PRICE_COL)
    }
}

impl GroupMeanDifference {
    pub fn new(group_col: impl Into<String>, value_col: impl Into<String>) -> Self {
        Self {
            group_col: group_col.into(),
            value_col: value_col.into(),
            output_col: None,
            group_means: BTreeMap::new(),
            fitted: false,
        }
    }

    pub fn with_output(mut self, output_col: impl Into<String>) -> Self {
        self.output_col = Some(output_col.into());
        self
    }

    pub fn output_column(&self) -> String {
        self.output_col
            .clone()
            .unwrap_or_else(|| format!("{}_diff_from_group_mean", self.value_col))
    }

    pub fn group_mean(&self, key: &str) -> Option<f64> {
        self.group_means.get(key).copied()
    }
}

impl FeatureStage for GroupMeanDifference {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, batch: &DataBatch, _target: Option<&[f64]>) -> Result<(), PipelineError> {
        let keys = key_column(batch, NAME, &self.group_col)?;
        let values = numeric_column(batch, NAME, &self.value_col)?;

        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for (key, value) in keys.into_iter().zip(values) {
            if let (Some(key), Some(value)) = (key, value) {
                let entry = sums.entry(key).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }

        self.group_means = sums
            .into_iter()
            .map(|(key, (sum, n))| (key, sum / n as f64))
            .collect();
        self.fitted = true;
        tracing::debug!(
            group_col = %self.group_col,
            groups = self.group_means.len(),
            "Fitted group means"
        );
        Ok(())
    }

    fn transform(&self, mut batch: DataBatch) -> Result<DataBatch, PipelineError> {
        if !self.fitted {
            return Err(PipelineError::NotFitted { stage: NAME.into() });
        }
        let keys = key_column(&batch, NAME, &self.group_col)?;
        let values = numeric_column(&batch, NAME, &self.value_col)?;

        let diffs = keys
            .iter()
            .zip(&values)
            .map(|(key, value)| {
                let mean = key.as_deref().and_then(|k| self.group_mean(k));
                match (value, mean) {
                    (Some(v), Some(m)) => Cell::from_f64(v - m),
                    _ => Cell::Null,
                }
            })
            .collect();

        batch.set_column(self.output_column(), diffs)?;
        Ok(batch)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn mark_fitted(&mut self) {
        self.fitted = true;
    }

    fn learned_entries(&self) -> usize {
        self.group_means.len()
    }
}
