//! In-memory tabular dataset: an ordered set of named, typed columns.

use crate::data::schema::{ColumnKind, ColumnSchema};
use crate::error::AutoMlError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Values of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => v.get(row).is_none_or(|c| c.is_none()),
            Self::Categorical(v) => v.get(row).is_none_or(|c| c.is_none()),
        }
    }

    fn take(&self, indices: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Self::Categorical(v) => {
                Self::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Categorical(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Logical kind; a column with no observed values is `Empty`.
    pub fn kind(&self) -> ColumnKind {
        if self.null_count() == self.len() {
            return ColumnKind::Empty;
        }
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn schema(&self) -> ColumnSchema {
        ColumnSchema {
            name: self.name.clone(),
            kind: self.kind(),
            null_count: self.null_count(),
        }
    }

    /// Numeric values, if this is a numeric column.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Cell rendered as text (used for class labels).
    pub fn display_value(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(format_number),
            ColumnData::Categorical(v) => v.get(row).cloned().flatten(),
        }
    }

    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            data: self.data.take(indices),
        }
    }
}

/// Render a number without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// An immutable table of equally long, uniquely named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset, rejecting ragged or duplicated columns.
    pub fn new(columns: Vec<Column>) -> Result<Self, AutoMlError> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut names = HashSet::new();
        for column in &columns {
            if column.len() != n_rows {
                return Err(AutoMlError::dataset_load(
                    "<memory>",
                    format!(
                        "column '{}' has {} rows, expected {n_rows}",
                        column.name,
                        column.len()
                    ),
                ));
            }
            if !names.insert(column.name.as_str()) {
                return Err(AutoMlError::dataset_load(
                    "<memory>",
                    format!("duplicate column '{}'", column.name),
                ));
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.columns.iter().map(Column::schema).collect()
    }

    /// Rows selected (and reordered) by `indices`.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// A copy without the named column, plus that column.
    pub fn split_off(&self, name: &str) -> Option<(Self, Column)> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        let mut columns = self.columns.clone();
        let removed = columns.remove(idx);
        Some((
            Self {
                columns,
                n_rows: self.n_rows,
            },
            removed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::numeric("x", vec![Some(1.0), None, Some(3.0)]),
            Column::categorical("c", vec![Some("a".into()), Some("b".into()), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let err = Dataset::new(vec![
            Column::numeric("x", vec![Some(1.0)]),
            Column::numeric("y", vec![Some(1.0), Some(2.0)]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("column 'y'"));
    }

    #[test]
    fn test_take_reorders_rows() {
        let ds = sample().take(&[2, 0]);
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.column("x").unwrap().as_numeric().unwrap(), &[Some(3.0), Some(1.0)]);
    }

    #[test]
    fn test_split_off_leaves_source_untouched() {
        let ds = sample();
        let (features, target) = ds.split_off("c").unwrap();
        assert_eq!(features.column_names(), vec!["x"]);
        assert_eq!(target.name, "c");
        assert_eq!(ds.n_cols(), 2);
        assert!(ds.split_off("missing").is_none());
    }

    #[test]
    fn test_kind_and_display() {
        let empty = Column::numeric("e", vec![None, None]);
        assert_eq!(empty.kind(), ColumnKind::Empty);
        let col = Column::numeric("n", vec![Some(2.0), Some(0.5)]);
        assert_eq!(col.display_value(0).as_deref(), Some("2"));
        assert_eq!(col.display_value(1).as_deref(), Some("0.5"));
    }
}
