//! Tabular batch passed between feature stages.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single tabular value.
///
/// Numeric results that are not finite are stored as [`Cell::Null`], so a
/// batch never carries NaN or infinities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Wrap a computed value, mapping NaN and infinities to `Null`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Float(value)
        } else {
            Self::Null
        }
    }

    /// Wrap an optional computed value.
    pub fn from_opt(value: Option<f64>) -> Self {
        value.map(Self::from_f64).unwrap_or(Self::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell. `Null` and text both yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Null | Self::Text(_) => None,
        }
    }

    /// Key used for group lookups.
    ///
    /// Integral floats share a key with the equivalent integer so that `1`
    /// and `1.0` land in the same group.
    pub fn group_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A batch of rows keyed by column name.
///
/// Column names are unique. Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a batch from column names and row-major cells.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(PipelineError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }
        for row in &rows {
            if row.len() != columns.len() {
                return Err(PipelineError::ShapeMismatch {
                    column: "<row>".into(),
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a one-row batch from `(column, value)` pairs.
    pub fn from_record<I, K>(record: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (K, Cell)>,
        K: Into<String>,
    {
        let (columns, cells): (Vec<String>, Vec<Cell>) =
            record.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self::from_rows(columns, vec![cells])
    }

    /// Caller guarantees unique column names and row widths.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replace the named column or append it at the end.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Cell>,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        if values.len() != self.rows.len() {
            return Err(PipelineError::ShapeMismatch {
                column: name,
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        match self.column_index(&name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove the named column. Returns whether it was present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Rename a column in place. Returns whether it was present.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<bool, PipelineError> {
        if from != to && self.has_column(to) {
            return Err(PipelineError::DuplicateColumn { column: to.into() });
        }
        match self.columns.iter_mut().find(|c| c.as_str() == from) {
            Some(col) => {
                *col = to.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
