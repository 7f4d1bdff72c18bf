//! Preprocessing plan: which columns go through which steps.
//!
//! A plan is pure structure. Statistics (means, modes, category sets) are only
//! learned by [`PreprocessingPlan::fit`], which every pipeline calls on its own
//! training rows. The plan itself is built from training features only.

use crate::data::{ColumnKind, Dataset};
use crate::error::ModelError;
use crate::preprocess::fitted::FittedPreprocessor;
use serde::{Deserialize, Serialize};

/// How missing values are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    MostFrequent,
}

/// What to do with a category never seen during fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategory {
    /// Encode as all zeros.
    Ignore,
    Error,
}

/// A single transformation step, unfitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Impute { strategy: ImputeStrategy },
    StandardScale,
    OneHotEncode { handle_unknown: UnknownCategory },
}

/// Columns that share a step sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroup {
    pub name: String,
    pub columns: Vec<String>,
    pub steps: Vec<Step>,
}

impl ColumnGroup {
    fn numeric(columns: Vec<String>) -> Self {
        Self {
            name: "num".into(),
            columns,
            steps: vec![
                Step::Impute {
                    strategy: ImputeStrategy::Mean,
                },
                Step::StandardScale,
            ],
        }
    }

    fn categorical(columns: Vec<String>) -> Self {
        Self {
            name: "cat".into(),
            columns,
            steps: vec![
                Step::Impute {
                    strategy: ImputeStrategy::MostFrequent,
                },
                Step::OneHotEncode {
                    handle_unknown: UnknownCategory::Ignore,
                },
            ],
        }
    }
}

/// Column-group → step-sequence mapping, shared read-only across trainers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingPlan {
    pub numeric: ColumnGroup,
    pub categorical: ColumnGroup,
}

impl PreprocessingPlan {
    /// Build a plan from the training feature columns.
    ///
    /// Columns with no observed value are left out, like any column not
    /// listed in a group.
    pub fn build(x_train: &Dataset) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for column in x_train.columns() {
            match column.kind() {
                ColumnKind::Numeric => numeric.push(column.name.clone()),
                ColumnKind::Categorical => categorical.push(column.name.clone()),
                ColumnKind::Empty => {
                    tracing::debug!(column = %column.name, "Skipping column without values");
                }
            }
        }
        Self {
            numeric: ColumnGroup::numeric(numeric),
            categorical: ColumnGroup::categorical(categorical),
        }
    }

    pub fn groups(&self) -> [&ColumnGroup; 2] {
        [&self.numeric, &self.categorical]
    }

    /// Names of every input column the plan consumes.
    pub fn input_columns(&self) -> Vec<&str> {
        self.groups()
            .into_iter()
            .flat_map(|g| g.columns.iter().map(String::as_str))
            .collect()
    }

    /// Learn step statistics from `x` (a training set or CV training fold).
    pub fn fit(&self, x: &Dataset) -> Result<FittedPreprocessor, ModelError> {
        FittedPreprocessor::fit(self, x)
    }
}
