//! Label encoding for the target column.

use crate::data::{Column, ColumnData, format_number};
use crate::error::AutoMlError;
use crate::task::TaskType;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Sorted class labels of a classification target.
///
/// Index `1` is the positive class for binary F1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabels {
    labels: Vec<String>,
    /// Numeric label values, when every label is a number.
    numeric: Option<Vec<f64>>,
}

impl ClassLabels {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric.is_some()
    }

    /// Map a predicted class index back to the reported value: the label
    /// itself for numeric targets, the index otherwise.
    pub fn decode(&self, index: f64) -> f64 {
        let idx = index.round().max(0.0) as usize;
        match &self.numeric {
            Some(values) => values.get(idx).copied().unwrap_or(index),
            None => idx as f64,
        }
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// Training and test targets as `f64` arrays.
#[derive(Debug, Clone)]
pub struct EncodedTarget {
    pub train: Array1<f64>,
    pub test: Array1<f64>,
    pub classes: Option<ClassLabels>,
}

impl EncodedTarget {
    pub fn n_classes(&self) -> usize {
        self.classes.as_ref().map_or(0, ClassLabels::len)
    }

    /// Convert raw model outputs to reported prediction values.
    pub fn decode(&self, predictions: &[f64]) -> Vec<f64> {
        match &self.classes {
            Some(classes) => predictions.iter().map(|&p| classes.decode(p)).collect(),
            None => predictions.to_vec(),
        }
    }
}

/// Encode the target column of both halves of a split.
///
/// Regression needs a numeric target. Classification accepts any target with
/// at least two distinct values; classes are collected from both halves so a
/// label seen only at test time still has an index.
pub fn encode_target(
    task: TaskType,
    y_train: &Column,
    y_test: &Column,
) -> Result<EncodedTarget, AutoMlError> {
    match task {
        TaskType::Regression => {
            let (Some(train), Some(test)) = (y_train.as_numeric(), y_test.as_numeric()) else {
                return Err(AutoMlError::UnusableTarget {
                    column: y_train.name.clone(),
                    reason: "regression requires a numeric target".into(),
                });
            };
            Ok(EncodedTarget {
                train: dense(train, &y_train.name)?,
                test: dense(test, &y_test.name)?,
                classes: None,
            })
        }
        TaskType::Classification => {
            let classes = collect_classes(y_train, y_test);
            if classes.len() < 2 {
                return Err(AutoMlError::UnusableTarget {
                    column: y_train.name.clone(),
                    reason: format!(
                        "classification requires at least two classes, found {}",
                        classes.len()
                    ),
                });
            }
            Ok(EncodedTarget {
                train: class_indices(y_train, &classes)?,
                test: class_indices(y_test, &classes)?,
                classes: Some(classes),
            })
        }
    }
}

fn dense(values: &[Option<f64>], name: &str) -> Result<Array1<f64>, AutoMlError> {
    values
        .iter()
        .map(|v| {
            v.ok_or_else(|| AutoMlError::UnusableTarget {
                column: name.to_string(),
                reason: "target contains missing values".into(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Array1::from)
}

fn collect_classes(y_train: &Column, y_test: &Column) -> ClassLabels {
    match (&y_train.data, &y_test.data) {
        (ColumnData::Numeric(a), ColumnData::Numeric(b)) => {
            let mut values: Vec<f64> = a.iter().chain(b).flatten().copied().collect();
            values.sort_by(f64::total_cmp);
            values.dedup();
            ClassLabels {
                labels: values.iter().copied().map(format_number).collect(),
                numeric: Some(values),
            }
        }
        _ => {
            let rows = (0..y_train.len())
                .filter_map(|r| y_train.display_value(r))
                .chain((0..y_test.len()).filter_map(|r| y_test.display_value(r)));
            let mut labels: Vec<String> = rows.collect();
            labels.sort();
            labels.dedup();
            ClassLabels {
                labels,
                numeric: None,
            }
        }
    }
}

fn class_indices(column: &Column, classes: &ClassLabels) -> Result<Array1<f64>, AutoMlError> {
    (0..column.len())
        .map(|row| {
            column
                .display_value(row)
                .and_then(|label| classes.index_of(&label))
                .map(|idx| idx as f64)
                .ok_or_else(|| AutoMlError::UnusableTarget {
                    column: column.name.clone(),
                    reason: format!("row {row} has no class label"),
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Array1::from)
}
