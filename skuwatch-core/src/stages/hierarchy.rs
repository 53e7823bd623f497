//! Per-hierarchy aggregates joined back onto each row.

use super::{FeatureStage, HIERARCHY_COL, PRICE_COL, WEIGHT_COL, key_column};
use crate::batch::{Cell, DataBatch};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NAME: &str = "hierarchy_aggregator";

/// Aggregation applied to a source column within each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Mean,
    /// Sample standard deviation (ddof = 1).
    Std,
    /// Non-null values.
    Count,
    Sum,
    Min,
    Max,
    Median,
}

impl AggFunc {
    fn needs_numbers(self) -> bool {
        !matches!(self, Self::Count)
    }

    fn apply(self, cells: &[&Cell]) -> Option<f64> {
        let values: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
        let n = values.len();
        match self {
            Self::Count => Some(cells.iter().filter(|c| !c.is_null()).count() as f64),
            Self::Sum => Some(values.iter().sum()),
            Self::Mean if n > 0 => Some(values.iter().sum::<f64>() / n as f64),
            Self::Std if n > 1 => {
                let mean = values.iter().sum::<f64>() / n as f64;
                let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                Some((ss / (n - 1) as f64).sqrt())
            }
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Median if n > 0 => {
                let mut sorted = values;
                sorted.sort_by(f64::total_cmp);
                let mid = n / 2;
                if n % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
            _ => None,
        }
    }
}

/// One output column: `output = func(source)` per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub output: String,
    pub source: String,
    pub func: AggFunc,
}

impl AggregateSpec {
    pub fn new(output: impl Into<String>, source: impl Into<String>, func: AggFunc) -> Self {
        Self {
            output: output.into(),
            source: source.into(),
            func,
        }
    }
}

/// Left-joins per-group aggregates onto each row by `group_col`.
///
/// `table` maps a group key to one value per entry of `aggregates`, in order.
/// Rows whose key was not seen at fit time get `Null` for every aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyAggregator {
    pub group_col: String,
    pub aggregates: Vec<AggregateSpec>,
    pub table: BTreeMap<String, Vec<Option<f64>>>,
    pub fitted: bool,
}

impl Default for HierarchyAggregator {
    fn default() -> Self {
        Self::new(
            HIERARCHY_COL,
            vec![
                AggregateSpec::new("Hierarchy_Weight_Mean", WEIGHT_COL, AggFunc::Mean),
                AggregateSpec::new("Hierarchy_Price_Std", PRICE_COL, AggFunc::Std),
                AggregateSpec::new("Hierarchy_Count", HIERARCHY_COL, AggFunc::Count),
            ],
        )
    }
}

impl HierarchyAggregator {
    pub fn new(group_col: impl Into<String>, aggregates: Vec<AggregateSpec>) -> Self {
        Self {
            group_col: group_col.into(),
            aggregates,
            table: BTreeMap::new(),
            fitted: false,
        }
    }

    /// Aggregates learned for `key`, if the group was seen at fit time.
    pub fn lookup(&self, key: &str) -> Option<&[Option<f64>]> {
        self.table.get(key).map(Vec::as_slice)
    }
}

impl FeatureStage for HierarchyAggregator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, batch: &DataBatch, _target: Option<&[f64]>) -> Result<(), PipelineError> {
        let keys = key_column(batch, NAME, &self.group_col)?;

        let mut sources = Vec::with_capacity(self.aggregates.len());
        for spec in &self.aggregates {
            let cells = batch
                .column(&spec.source)
                .ok_or_else(|| PipelineError::MissingColumn {
                    stage: NAME.into(),
                    column: spec.source.clone(),
                })?;
            if spec.func.needs_numbers() && cells.iter().any(|c| matches!(c, Cell::Text(_))) {
                return Err(PipelineError::NonNumeric {
                    stage: NAME.into(),
                    column: spec.source.clone(),
                });
            }
            sources.push(cells);
        }

        let mut members: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (row, key) in keys.into_iter().enumerate() {
            if let Some(key) = key {
                members.entry(key).or_default().push(row);
            }
        }

        self.table = members
            .into_iter()
            .map(|(key, rows)| {
                let values = self
                    .aggregates
                    .iter()
                    .zip(&sources)
                    .map(|(spec, cells)| {
                        let group: Vec<&Cell> = rows.iter().map(|&r| cells[r]).collect();
                        spec.func.apply(&group)
                    })
                    .collect();
                (key, values)
            })
            .collect();
        self.fitted = true;
        tracing::debug!(
            group_col = %self.group_col,
            groups = self.table.len(),
            "Fitted hierarchy aggregates"
        );
        Ok(())
    }

    fn transform(&self, mut batch: DataBatch) -> Result<DataBatch, PipelineError> {
        if !self.fitted {
            return Err(PipelineError::NotFitted { stage: NAME.into() });
        }
        let keys = key_column(&batch, NAME, &self.group_col)?;

        let mut outputs: Vec<Vec<Cell>> = vec![Vec::with_capacity(keys.len()); self.aggregates.len()];
        for key in &keys {
            let learned = key.as_deref().and_then(|k| self.lookup(k));
            if learned.is_none() {
                tracing::debug!(key = ?key, "No fitted aggregates for group");
            }
            for (i, column) in outputs.iter_mut().enumerate() {
                let value = learned.and_then(|vals| vals.get(i).copied().flatten());
                column.push(Cell::from_opt(value));
            }
        }

        for (spec, values) in self.aggregates.iter().zip(outputs) {
            batch.set_column(spec.output.clone(), values)?;
        }
        Ok(batch)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn mark_fitted(&mut self) {
        self.fitted = true;
    }

    fn learned_entries(&self) -> usize {
        self.table.len()
    }
}
