//! Structural stage removing columns.

use super::{FeatureStage, ensure_fitted};
use crate::batch::DataBatch;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

const NAME: &str = "column_dropper";

/// Removes the named columns. Columns that are not present are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDropper {
    #[serde(alias = "columns_to_drop")]
    pub columns: Vec<String>,
    pub fitted: bool,
}

impl ColumnDropper {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            fitted: false,
        }
    }
}

impl FeatureStage for ColumnDropper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&mut self, _batch: &DataBatch, _target: Option<&[f64]>) -> Result<(), PipelineError> {
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut batch: DataBatch) -> Result<DataBatch, PipelineError> {
        ensure_fitted(self)?;
        for column in &self.columns {
            batch.drop_column(column);
        }
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

    fn batch() -> DataBatch {
        DataBatch::from_record([
            ("Hierarchy", Cell::from("A")),
            ("Length", Cell::Float(1.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_drops_present_columns() {
        let out = fitted(ColumnDropper::new(["Hierarchy"])).transform(batch()).unwrap();
        assert_eq!(out.columns(), ["Length"]);
    }

    #[test]
    fn test_absent_column_is_noop() {
        let input = batch();
        let out = fitted(ColumnDropper::new(["does_not_exist"]))
            .transform(input.clone())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_accepts_legacy_field_name() {
        let stage: ColumnDropper =
            serde_json::from_str(r#"{"columns_to_drop": ["Hierarchy"]}"#).unwrap();
        assert_eq!(stage.columns, vec!["Hierarchy"]);
    }
}
