//! Fitted preprocessing: statistics learned from training rows, applied to any rows.

use crate::data::{ColumnData, Dataset};
use crate::error::ModelError;
use crate::preprocess::plan::{ImputeStrategy, PreprocessingPlan, Step, UnknownCategory};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fill value for a categorical column with no observed value in the fit rows.
const MISSING_CATEGORY: &str = "__missing__";

/// Per-column values flowing between steps.
enum Cells {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Encoded(Vec<Vec<f64>>),
}

/// A step with its learned statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FittedStep {
    ImputeNumeric { fill: f64 },
    ImputeCategory { fill: String },
    StandardScale { mean: f64, scale: f64 },
    OneHotEncode {
        categories: Vec<String>,
        handle_unknown: UnknownCategory,
    },
}

/// Fitted steps for one input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumn {
    pub column: String,
    pub steps: Vec<FittedStep>,
}

impl FittedColumn {
    fn width(&self) -> usize {
        match self.steps.last() {
            Some(FittedStep::OneHotEncode { categories, .. }) => categories.len(),
            _ => 1,
        }
    }

    fn feature_names(&self, group: &str) -> Vec<String> {
        match self.steps.last() {
            Some(FittedStep::OneHotEncode { categories, .. }) => categories
                .iter()
                .map(|c| format!("{group}__{}_{c}", self.column))
                .collect(),
            _ => vec![format!("{group}__{}", self.column)],
        }
    }
}

/// A preprocessing plan with every step fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    groups: Vec<(String, Vec<FittedColumn>)>,
    n_features: usize,
}

impl FittedPreprocessor {
    pub(crate) fn fit(plan: &PreprocessingPlan, x: &Dataset) -> Result<Self, ModelError> {
        if x.n_rows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        let mut groups = Vec::new();
        let mut n_features = 0;
        for group in plan.groups() {
            let mut fitted = Vec::with_capacity(group.columns.len());
            for name in &group.columns {
                let mut cells = input_cells(x, name)?;
                let mut steps = Vec::with_capacity(group.steps.len());
                for step in &group.steps {
                    let fitted_step = fit_step(step, &cells, name)?;
                    cells = apply_step(&fitted_step, cells, name)?;
                    steps.push(fitted_step);
                }
                let column = FittedColumn {
                    column: name.clone(),
                    steps,
                };
                n_features += column.width();
                fitted.push(column);
            }
            groups.push((group.name.clone(), fitted));
        }
        Ok(Self { groups, n_features })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Output feature names, in matrix column order.
    pub fn feature_names(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|(group, cols)| cols.iter().flat_map(move |c| c.feature_names(group)))
            .collect()
    }

    /// Transform rows into a dense feature matrix.
    pub fn transform(&self, x: &Dataset) -> Result<Array2<f64>, ModelError> {
        let n_rows = x.n_rows();
        let mut out = Array2::<f64>::zeros((n_rows, self.n_features));
        let mut offset = 0;
        for (_, columns) in &self.groups {
            for column in columns {
                let mut cells = input_cells(x, &column.column)?;
                for step in &column.steps {
                    cells = apply_step(step, cells, &column.column)?;
                }
                let width = column.width();
                match cells {
                    Cells::Numeric(values) => {
                        for (row, v) in values.into_iter().enumerate() {
                            out[[row, offset]] = v.ok_or_else(|| ModelError::NonFinite {
                                stage: format!("preprocessing of '{}'", column.column),
                            })?;
                        }
                    }
                    Cells::Encoded(rows) => {
                        for (row, encoded) in rows.into_iter().enumerate() {
                            for (j, v) in encoded.into_iter().enumerate() {
                                out[[row, offset + j]] = v;
                            }
                        }
                    }
                    Cells::Text(_) => {
                        return Err(ModelError::Preprocess(format!(
                            "column '{}' was not encoded",
                            column.column
                        )));
                    }
                }
                offset += width;
            }
        }
        Ok(out)
    }
}

fn input_cells(x: &Dataset, name: &str) -> Result<Cells, ModelError> {
    let column = x
        .column(name)
        .ok_or_else(|| ModelError::Preprocess(format!("missing input column '{name}'")))?;
    Ok(match &column.data {
        ColumnData::Numeric(v) => Cells::Numeric(v.clone()),
        ColumnData::Categorical(v) => Cells::Text(v.clone()),
    })
}

fn fit_step(step: &Step, cells: &Cells, name: &str) -> Result<FittedStep, ModelError> {
    let mismatch = || ModelError::Preprocess(format!("step {step:?} cannot apply to '{name}'"));
    match (step, cells) {
        (
            Step::Impute {
                strategy: ImputeStrategy::Mean,
            },
            Cells::Numeric(values),
        ) => {
            let observed: Vec<f64> = values.iter().flatten().copied().collect();
            let fill = if observed.is_empty() {
                0.0
            } else {
                observed.iter().sum::<f64>() / observed.len() as f64
            };
            Ok(FittedStep::ImputeNumeric { fill })
        }
        (
            Step::Impute {
                strategy: ImputeStrategy::MostFrequent,
            },
            Cells::Text(values),
        ) => Ok(FittedStep::ImputeCategory {
            fill: most_frequent(values.iter().flatten()),
        }),
        (Step::StandardScale, Cells::Numeric(values)) => {
            let observed: Vec<f64> = values.iter().flatten().copied().collect();
            if observed.is_empty() {
                return Ok(FittedStep::StandardScale {
                    mean: 0.0,
                    scale: 1.0,
                });
            }
            let n = observed.len() as f64;
            let mean = observed.iter().sum::<f64>() / n;
            let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            let scale = if std > f64::EPSILON { std } else { 1.0 };
            Ok(FittedStep::StandardScale { mean, scale })
        }
        (Step::OneHotEncode { handle_unknown }, Cells::Text(values)) => {
            let mut categories: Vec<String> = values.iter().flatten().cloned().collect();
            categories.sort();
            categories.dedup();
            Ok(FittedStep::OneHotEncode {
                categories,
                handle_unknown: *handle_unknown,
            })
        }
        _ => Err(mismatch()),
    }
}

fn apply_step(step: &FittedStep, cells: Cells, name: &str) -> Result<Cells, ModelError> {
    match (step, cells) {
        (FittedStep::ImputeNumeric { fill }, Cells::Numeric(values)) => Ok(Cells::Numeric(
            values.into_iter().map(|v| Some(v.unwrap_or(*fill))).collect(),
        )),
        (FittedStep::ImputeCategory { fill }, Cells::Text(values)) => Ok(Cells::Text(
            values
                .into_iter()
                .map(|v| Some(v.unwrap_or_else(|| fill.clone())))
                .collect(),
        )),
        (FittedStep::StandardScale { mean, scale }, Cells::Numeric(values)) => Ok(Cells::Numeric(
            values
                .into_iter()
                .map(|v| v.map(|x| (x - mean) / scale))
                .collect(),
        )),
        (
            FittedStep::OneHotEncode {
                categories,
                handle_unknown,
            },
            Cells::Text(values),
        ) => {
            let mut rows = Vec::with_capacity(values.len());
            for value in values {
                let mut encoded = vec![0.0; categories.len()];
                if let Some(value) = value {
                    match categories.binary_search(&value) {
                        Ok(idx) => encoded[idx] = 1.0,
                        Err(_) if *handle_unknown == UnknownCategory::Ignore => {}
                        Err(_) => {
                            return Err(ModelError::Preprocess(format!(
                                "unknown category '{value}' in column '{name}'"
                            )));
                        }
                    }
                }
                rows.push(encoded);
            }
            Ok(Cells::Encoded(rows))
        }
        (step, _) => Err(ModelError::Preprocess(format!(
            "fitted step {step:?} cannot apply to '{name}'"
        ))),
    }
}

/// Most frequent value; ties go to the lexically smallest.
fn most_frequent<'a>(values: impl Iterator<Item = &'a String>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
        .unwrap_or_else(|| MISSING_CATEGORY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn train() -> Dataset {
        Dataset::new(vec![
            Column::numeric("age", vec![Some(10.0), None, Some(30.0)]),
            Column::categorical(
                "port",
                vec![Some("S".into()), Some("C".into()), Some("S".into())],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_fit_learns_train_statistics() {
        let plan = PreprocessingPlan::build(&train());
        let fitted = plan.fit(&train()).unwrap();
        assert_eq!(fitted.n_features(), 3);
        assert_eq!(
            fitted.feature_names(),
            vec!["num__age", "cat__port_C", "cat__port_S"]
        );

        let x = fitted.transform(&train()).unwrap();
        // Imputed row sits exactly at the mean, so it scales to zero.
        assert!(x[[1, 0]].abs() < 1e-12);
        assert!((x[[0, 0]] + x[[2, 0]]).abs() < 1e-12);
        assert_eq!(x.row(1).to_vec()[1..], [1.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_encodes_as_zeros() {
        let plan = PreprocessingPlan::build(&train());
        let fitted = plan.fit(&train()).unwrap();
        let test = Dataset::new(vec![
            Column::numeric("age", vec![Some(20.0)]),
            Column::categorical("port", vec![Some("Q".into())]),
        ])
        .unwrap();
        let x = fitted.transform(&test).unwrap();
        assert_eq!(x.row(0).to_vec()[1..], [0.0, 0.0]);
    }

    #[test]
    fn test_missing_category_imputed_with_mode() {
        let plan = PreprocessingPlan::build(&train());
        let fitted = plan.fit(&train()).unwrap();
        let test = Dataset::new(vec![
            Column::numeric("age", vec![None]),
            Column::categorical("port", vec![None]),
        ])
        .unwrap();
        let x = fitted.transform(&test).unwrap();
        assert_eq!(x.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let ds = Dataset::new(vec![Column::numeric("c", vec![Some(5.0), Some(5.0)])]).unwrap();
        let fitted = PreprocessingPlan::build(&ds).fit(&ds).unwrap();
        let x = fitted.transform(&ds).unwrap();
        assert_eq!(x.column(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_most_frequent_tie_breaks_lexically() {
        let values = ["b".to_string(), "a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(most_frequent(values.iter()), "a");
    }

    #[test]
    fn test_missing_input_column_fails() {
        let plan = PreprocessingPlan::build(&train());
        let fitted = plan.fit(&train()).unwrap();
        let other = Dataset::new(vec![Column::numeric("age", vec![Some(1.0)])]).unwrap();
        assert!(fitted.transform(&other).is_err());
    }
}
