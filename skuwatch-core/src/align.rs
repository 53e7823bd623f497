//! Alignment of pipeline output to the classifier's feature columns.

use crate::batch::{Cell, DataBatch};
use crate::error::PipelineError;

/// Value used for canonical columns the pipeline did not produce, and for
/// null cells within canonical columns.
pub const FILL_VALUE: Cell = Cell::Float(0.0);

/// Reshape `batch` to exactly `feature_columns`, in that order.
///
/// Missing columns are inserted with [`FILL_VALUE`], null cells are replaced
/// with it, and columns the classifier does not expect are dropped. Aligning
/// an aligned batch returns it unchanged.
pub fn align_features(batch: &DataBatch, feature_columns: &[String]) -> DataBatch {
    let indices: Vec<Option<usize>> = feature_columns
        .iter()
        .map(|c| batch.column_index(c))
        .collect();

    let missing: Vec<&str> = feature_columns
        .iter()
        .zip(&indices)
        .filter(|(_, idx)| idx.is_none())
        .map(|(c, _)| c.as_str())
        .collect();
    if !missing.is_empty() {
        tracing::debug!(?missing, "Filling feature columns absent from pipeline output");
    }

    let rows = batch
        .rows()
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|idx| match idx.map(|i| &row[i]) {
                    Some(cell) if !cell.is_null() => cell.clone(),
                    _ => FILL_VALUE,
                })
                .collect()
        })
        .collect();

    DataBatch::from_parts(feature_columns.to_vec(), rows)
}

/// Numeric feature matrix of an aligned batch, one vector per row.
pub fn feature_matrix(batch: &DataBatch) -> Result<Vec<Vec<f64>>, PipelineError> {
    batch
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(batch.columns())
                .map(|(cell, column)| match cell {
                    Cell::Null => Err(PipelineError::NullFeature {
                        column: column.clone(),
                    }),
                    Cell::Text(_) => Err(PipelineError::NonNumeric {
                        stage: "align".into(),
                        column: column.clone(),
                    }),
                    Cell::Int(i) => Ok(*i as f64),
                    Cell::Float(f) => Ok(*f),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn canonical() -> Vec<String> {
        vec!["b".into(), "a".into(), "z".into()]
    }

    fn batch() -> DataBatch {
        DataBatch::from_record([
            ("a", Cell::Int(1)),
            ("extra", Cell::from("drop me")),
            ("b", Cell::Float(2.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_reorders_pads_and_drops() {
        let aligned = align_features(&batch(), &canonical());
        assert_eq!(aligned.columns(), ["b", "a", "z"]);
        assert_eq!(
            aligned.rows()[0],
            vec![Cell::Float(2.0), Cell::Int(1), Cell::Float(0.0)]
        );
    }

    #[test]
    fn test_null_cells_become_zero() {
        let input = DataBatch::from_record([("a", Cell::Null)]).unwrap();
        let aligned = align_features(&input, &["a".to_string()]);
        assert_eq!(aligned.get(0, "a"), Some(&Cell::Float(0.0)));
    }

    #[test]
    fn test_alignment_is_idempotent() {
        let once = align_features(&batch(), &canonical());
        let twice = align_features(&once, &canonical());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_feature_matrix() {
        let aligned = align_features(&batch(), &canonical());
        assert_eq!(feature_matrix(&aligned).unwrap(), vec![vec![2.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_feature_matrix_rejects_text() {
        let input = DataBatch::from_record([("h", Cell::from("A"))]).unwrap();
        let aligned = align_features(&input, &["h".to_string()]);
        assert!(matches!(
            feature_matrix(&aligned),
            Err(PipelineError::NonNumeric { .. })
        ));
    }
}
