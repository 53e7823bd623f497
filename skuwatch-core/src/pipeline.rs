//! Ordered feature pipeline.

use crate::batch::DataBatch;
use crate::error::PipelineError;
use crate::stages::{FeatureStage, Stage};
use serde::{Deserialize, Serialize};

/// A named stage within the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    pub stage: Stage,
}

/// Stages executed left to right, each receiving its predecessor's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, name: impl Into<String>, stage: impl Into<Stage>) -> Self {
        self.push(name, stage);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, stage: impl Into<Stage>) {
        self.steps.push(PipelineStep {
            name: name.into(),
            stage: stage.into(),
        });
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fit every stage in order, feeding each the transformed output of the
    /// stages before it. Returns the fully transformed batch.
    pub fn fit_transform(
        &mut self,
        batch: DataBatch,
        target: Option<&[f64]>,
    ) -> Result<DataBatch, PipelineError> {
        let mut batch = batch;
        for step in &mut self.steps {
            step.stage.fit(&batch, target)?;
            batch = step.stage.transform(batch)?;
        }
        Ok(batch)
    }

    pub fn fit(&mut self, batch: DataBatch, target: Option<&[f64]>) -> Result<(), PipelineError> {
        self.fit_transform(batch, target).map(|_| ())
    }

    /// Replay the fitted stages. Never refits.
    pub fn transform(&self, batch: DataBatch) -> Result<DataBatch, PipelineError> {
        let mut batch = batch;
        for step in &self.steps {
            if !step.stage.is_fitted() {
                return Err(PipelineError::NotFitted {
                    stage: step.name.clone(),
                });
            }
            batch = step.stage.transform(batch)?;
            tracing::trace!(
                step = %step.name,
                columns = batch.column_count(),
                "Applied stage"
            );
        }
        Ok(batch)
    }

    pub fn is_fitted(&self) -> bool {
        self.steps.iter().all(|s| s.stage.is_fitted())
    }

    /// Mark every stage fitted. Returns how many stages had to be patched.
    pub fn mark_all_fitted(&mut self) -> usize {
        let mut patched = 0;
        for step in &mut self.steps {
            if !step.stage.is_fitted() {
                step.stage.mark_fitted();
                patched += 1;
            }
        }
        patched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Cell;
    use crate::stages::{AspectRatio, ColumnDropper, HierarchyAggregator, PricePerGram};

    fn record() -> DataBatch {
        DataBatch::from_record([
            ("Price In Dollar", Cell::Float(25.0)),
            ("Length", Cell::Float(10.0)),
            ("Width", Cell::Float(5.0)),
            ("Height", Cell::Float(2.0)),
            ("Final Weights in Grams", Cell::Float(100.0)),
            ("Hierarchy", Cell::from("A")),
        ])
        .unwrap()
    }

    #[test]
    fn test_transform_runs_stages_in_order() {
        let mut pipeline = Pipeline::new()
            .add_step("ppg", PricePerGram::default())
            .add_step("aspect", AspectRatio::default())
            .add_step("drop", ColumnDropper::new(["Hierarchy", "Length"]));
        pipeline.mark_all_fitted();

        let out = pipeline.transform(record()).unwrap();
        assert!(!out.has_column("Hierarchy"));
        assert!(!out.has_column("Length"));
        assert_eq!(out.columns().last().map(String::as_str), Some("W_by_H"));
    }

    #[test]
    fn test_unfitted_stage_is_rejected_by_name() {
        let pipeline = Pipeline::new().add_step("ppg", PricePerGram::default());
        match pipeline.transform(record()) {
            Err(PipelineError::NotFitted { stage }) => assert_eq!(stage, "ppg"),
            other => panic!("Expected NotFitted, got {:?}", other),
        }
    }

    #[test]
    fn test_mark_all_fitted_counts_patches() {
        let mut pipeline = Pipeline::new()
            .add_step("ppg", PricePerGram::default())
            .add_step("aspect", AspectRatio::default());
        assert!(!pipeline.is_fitted());
        assert_eq!(pipeline.mark_all_fitted(), 2);
        assert_eq!(pipeline.mark_all_fitted(), 0);
        assert!(pipeline.is_fitted());
    }

    #[test]
    fn test_fit_transform_fits_stateful_stage() {
        let mut pipeline = Pipeline::new().add_step("agg", HierarchyAggregator::default());
        let out = pipeline.fit_transform(record(), None).unwrap();
        assert!(pipeline.is_fitted());
        assert_eq!(out.get(0, "Hierarchy_Count"), Some(&Cell::Float(1.0)));
    }

    #[test]
    fn test_stage_failure_stops_pipeline() {
        let mut pipeline = Pipeline::new()
            .add_step("drop", ColumnDropper::new(["Width"]))
            .add_step("aspect", AspectRatio::default());
        pipeline.mark_all_fitted();
        let err = pipeline.transform(record()).unwrap_err();
        assert!(err.to_string().contains("Width"));
    }
}
