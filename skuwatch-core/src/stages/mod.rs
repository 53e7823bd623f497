//! Feature transform stages.
//!
//! Every stage implements [`FeatureStage`]. The persisted form is the
//! [`Stage`] enum, tagged by `"type"` in the artifact JSON, which dispatches
//! to the concrete stage.
//!
//! Stage defaults match the training-time column names, so a stage written
//! as `{"type": "price_per_gram"}` replays exactly what training produced.

mod aspect;
mod density;
mod dropper;
mod group_mean;
mod hierarchy;
mod price;

pub use aspect::AspectRatio;
pub use density::LogDensityVolume;
pub use dropper::ColumnDropper;
pub use group_mean::GroupMeanDifference;
pub use hierarchy::{AggFunc, AggregateSpec, HierarchyAggregator};
pub use price::PricePerGram;

use crate::batch::{Cell, DataBatch};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Guard added to denominators and `log1p` arguments.
pub const EPSILON: f64 = 1e-6;

pub const WEIGHT_COL: &str = "Final Weights in Grams";
pub const PRICE_COL: &str = "Price In Dollar";
pub const CATEGORY_COL: &str = "Count Category";
pub const HIERARCHY_COL: &str = "Hierarchy";
pub const LENGTH_COL: &str = "Length";
pub const WIDTH_COL: &str = "Width";
pub const HEIGHT_COL: &str = "Height";

/// Common interface of the feature stages.
pub trait FeatureStage: Send + Sync {
    /// Kind of the stage, used in error messages and reports.
    fn name(&self) -> &'static str;

    /// Learn the stage's statistics from a training batch.
    ///
    /// Fitting is idempotent: the same batch always produces the same state.
    fn fit(&mut self, batch: &DataBatch, target: Option<&[f64]>) -> Result<(), PipelineError>;

    /// Apply the stage using its frozen statistics.
    fn transform(&self, batch: DataBatch) -> Result<DataBatch, PipelineError>;

    fn is_fitted(&self) -> bool;

    /// Set the fitted flag without touching learned state.
    fn mark_fitted(&mut self);

    /// Number of learned entries (groups) held by the stage.
    fn learned_entries(&self) -> usize {
        0
    }
}

/// Persisted stage, tagged by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    GroupMeanDifference(GroupMeanDifference),
    LogDensityVolume(LogDensityVolume),
    PricePerGram(PricePerGram),
    AspectRatio(AspectRatio),
    HierarchyAggregator(HierarchyAggregator),
    ColumnDropper(ColumnDropper),
}

impl Stage {
    fn inner(&self) -> &dyn FeatureStage {
        match self {
            Self::GroupMeanDifference(s) => s,
            Self::LogDensityVolume(s) => s,
            Self::PricePerGram(s) => s,
            Self::AspectRatio(s) => s,
            Self::HierarchyAggregator(s) => s,
            Self::ColumnDropper(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FeatureStage {
        match self {
            Self::GroupMeanDifference(s) => s,
            Self::LogDensityVolume(s) => s,
            Self::PricePerGram(s) => s,
            Self::AspectRatio(s) => s,
            Self::HierarchyAggregator(s) => s,
            Self::ColumnDropper(s) => s,
        }
    }
}

impl FeatureStage for Stage {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, batch: &DataBatch, target: Option<&[f64]>) -> Result<(), PipelineError> {
        self.inner_mut().fit(batch, target)
    }

    fn transform(&self, batch: DataBatch) -> Result<DataBatch, PipelineError> {
        self.inner().transform(batch)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn mark_fitted(&mut self) {
        self.inner_mut().mark_fitted()
    }

    fn learned_entries(&self) -> usize {
        self.inner().learned_entries()
    }
}

macro_rules! impl_from_stage {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Stage {
                fn from(stage: $variant) -> Self {
                    Self::$variant(stage)
                }
            }
        )*
    };
}

impl_from_stage!(
    GroupMeanDifference,
    LogDensityVolume,
    PricePerGram,
    AspectRatio,
    HierarchyAggregator,
    ColumnDropper,
);

/// Refuse to transform with a stage that was never fitted or marked fitted.
pub(crate) fn ensure_fitted(stage: &dyn FeatureStage) -> Result<(), PipelineError> {
    if stage.is_fitted() {
        Ok(())
    } else {
        Err(PipelineError::NotFitted {
            stage: stage.name().to_string(),
        })
    }
}

/// Mark a freshly built stage fitted, for stage-level tests.
#[cfg(test)]
pub(crate) fn fitted<S: FeatureStage>(mut stage: S) -> S {
    stage.mark_fitted();
    stage
}

/// Read a required column as optional numbers, one per row.
pub(crate) fn numeric_column(
    batch: &DataBatch,
    stage: &str,
    column: &str,
) -> Result<Vec<Option<f64>>, PipelineError> {
    let cells = batch
        .column(column)
        .ok_or_else(|| PipelineError::MissingColumn {
            stage: stage.to_string(),
            column: column.to_string(),
        })?;
    cells
        .into_iter()
        .map(|cell| match cell {
            Cell::Text(_) => Err(PipelineError::NonNumeric {
                stage: stage.to_string(),
                column: column.to_string(),
            }),
            other => Ok(other.as_f64()),
        })
        .collect()
}

/// Read a required column as group keys, one per row.
pub(crate) fn key_column(
    batch: &DataBatch,
    stage: &str,
    column: &str,
) -> Result<Vec<Option<String>>, PipelineError> {
    let cells = batch
        .column(column)
        .ok_or_else(|| PipelineError::MissingColumn {
            stage: stage.to_string(),
            column: column.to_string(),
        })?;
    Ok(cells.into_iter().map(Cell::group_key).collect())
}

/// Combine two optional operands; any absent operand gives `Null`.
pub(crate) fn zip_with(
    a: &[Option<f64>],
    b: &[Option<f64>],
    f: impl Fn(f64, f64) -> f64,
) -> Vec<Cell> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Cell::from_f64(f(*x, *y)),
            _ => Cell::Null,
        })
        .collect()
}
