//! The fixed catalogue of model families per task type.

use crate::models::{ModelFamily, ParamValue};
use crate::task::{Metric, TaskType};
use serde::Serialize;

/// Prefix routing a search-space key to the pipeline's model step.
pub const MODEL_STEP_PREFIX: &str = "model__";

/// A finite hyperparameter grid; dimensions keep their declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSpace {
    dims: Vec<(String, Vec<ParamValue>)>,
}

impl SearchSpace {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a model-step dimension (`name` without the step prefix).
    pub fn with(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.dims
            .push((format!("{MODEL_STEP_PREFIX}{name}"), values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn dims(&self) -> &[(String, Vec<ParamValue>)] {
        &self.dims
    }

    /// Number of configurations in the full grid.
    pub fn size(&self) -> usize {
        if self.dims.is_empty() {
            return 0;
        }
        self.dims
            .iter()
            .map(|(_, values)| values.len())
            .fold(1usize, usize::saturating_mul)
    }

    /// The `index`-th grid configuration; the last dimension varies fastest.
    pub fn config_at(&self, mut index: usize) -> Vec<(String, ParamValue)> {
        let mut config = Vec::with_capacity(self.dims.len());
        for (name, values) in self.dims.iter().rev() {
            let radix = values.len().max(1);
            let pick = index % radix;
            index /= radix;
            if let Some(value) = values.get(pick) {
                config.push((name.clone(), value.clone()));
            }
        }
        config.reverse();
        config
    }
}

/// Static description of one candidate model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: &'static str,
    pub family: ModelFamily,
    /// Empty means "fit directly, no search".
    pub search_space: SearchSpace,
    pub metric: Metric,
    /// Training cost grows fast with rows; eligible for training subsampling.
    pub scales_poorly: bool,
}

fn ints(values: &[i64]) -> Vec<ParamValue> {
    values.iter().copied().map(ParamValue::Int).collect()
}

fn floats(values: &[f64]) -> Vec<ParamValue> {
    values.iter().copied().map(ParamValue::Float).collect()
}

fn tree_space() -> SearchSpace {
    SearchSpace::empty()
        .with(
            "max_depth",
            vec![
                ParamValue::None,
                ParamValue::Int(4),
                ParamValue::Int(6),
                ParamValue::Int(8),
            ],
        )
        .with("min_samples_split", ints(&[2, 5, 10]))
        .with("min_samples_leaf", ints(&[1, 2, 4]))
}

fn forest_space() -> SearchSpace {
    SearchSpace::empty()
        .with("n_estimators", ints(&[100, 200]))
        .with(
            "max_depth",
            vec![ParamValue::None, ParamValue::Int(10), ParamValue::Int(20)],
        )
        .with("min_samples_split", ints(&[2, 5]))
}

fn gradient_boosting_space() -> SearchSpace {
    SearchSpace::empty()
        .with("n_estimators", ints(&[100, 200]))
        .with("max_depth", ints(&[3, 6]))
        .with("learning_rate", floats(&[0.01, 0.1]))
}

fn hist_gradient_boosting_space() -> SearchSpace {
    SearchSpace::empty()
        .with("n_estimators", ints(&[100, 300, 500, 1000]))
        .with("learning_rate", floats(&[0.01, 0.03, 0.05, 0.1]))
        .with("num_leaves", ints(&[20, 31, 50, 70, 100]))
        .with("max_depth", ints(&[-1, 5, 10, 20, 30]))
        .with("min_child_samples", ints(&[5, 10, 20, 50]))
        .with("subsample", floats(&[0.6, 0.8, 1.0]))
        .with("colsample_bytree", floats(&[0.6, 0.8, 1.0]))
        .with("reg_alpha", floats(&[0.0, 0.01, 0.1, 1.0]))
        .with("reg_lambda", floats(&[0.0, 0.01, 0.1, 1.0]))
}

fn spec(
    name: &'static str,
    family: ModelFamily,
    search_space: SearchSpace,
    metric: Metric,
) -> ModelSpec {
    ModelSpec {
        name,
        family,
        search_space,
        metric,
        scales_poorly: matches!(
            family,
            ModelFamily::GradientBoosting | ModelFamily::HistGradientBoosting
        ),
    }
}

/// Candidate models for `task`, in submission order.
pub fn specs_for(task: TaskType) -> Vec<ModelSpec> {
    let metric = task.metric();
    match task {
        TaskType::Regression => vec![
            spec(
                "LinearRegression",
                ModelFamily::LinearRegression,
                SearchSpace::empty(),
                metric,
            ),
            spec(
                "Ridge",
                ModelFamily::Ridge,
                SearchSpace::empty().with("alpha", floats(&[0.01, 0.1, 1.0, 10.0])),
                metric,
            ),
            spec("DecisionTree", ModelFamily::DecisionTree, tree_space(), metric),
            spec("RandomForest", ModelFamily::RandomForest, forest_space(), metric),
            spec(
                "GradientBoosting",
                ModelFamily::GradientBoosting,
                gradient_boosting_space(),
                metric,
            ),
            spec(
                "HistGradientBoosting",
                ModelFamily::HistGradientBoosting,
                hist_gradient_boosting_space(),
                metric,
            ),
        ],
        TaskType::Classification => vec![
            spec(
                "LogisticRegression",
                ModelFamily::LogisticRegression,
                SearchSpace::empty(),
                metric,
            ),
            spec("DecisionTree", ModelFamily::DecisionTree, tree_space(), metric),
            spec("RandomForest", ModelFamily::RandomForest, forest_space(), metric),
            spec(
                "GradientBoosting",
                ModelFamily::GradientBoosting,
                gradient_boosting_space(),
                metric,
            ),
            spec(
                "HistGradientBoosting",
                ModelFamily::HistGradientBoosting,
                hist_gradient_boosting_space(),
                metric,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_catalogue() {
        let specs = specs_for(TaskType::Regression);
        let names: Vec<_> = specs.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "LinearRegression",
                "Ridge",
                "DecisionTree",
                "RandomForest",
                "GradientBoosting",
                "HistGradientBoosting"
            ]
        );
        assert!(specs[0].search_space.is_empty());
        assert!(specs.iter().all(|s| s.metric == Metric::MeanAbsoluteError));
        assert_eq!(
            specs.iter().filter(|s| s.scales_poorly).count(),
            2
        );
    }

    #[test]
    fn test_classification_catalogue() {
        let specs = specs_for(TaskType::Classification);
        assert_eq!(specs.len(), 5);
        assert_eq!(specs[0].family, ModelFamily::LogisticRegression);
        assert!(specs.iter().all(|s| s.metric == Metric::F1));
    }

    #[test]
    fn test_grid_sizes() {
        assert_eq!(tree_space().size(), 36);
        assert_eq!(forest_space().size(), 12);
        assert_eq!(hist_gradient_boosting_space().size(), 230_400);
        assert_eq!(SearchSpace::empty().size(), 0);
    }

    #[test]
    fn test_config_at_is_mixed_radix() {
        let space = gradient_boosting_space();
        let first = space.config_at(0);
        assert_eq!(first[0], ("model__n_estimators".into(), ParamValue::Int(100)));
        let last = space.config_at(space.size() - 1);
        assert_eq!(last[0].1, ParamValue::Int(200));
        assert_eq!(last[1].1, ParamValue::Int(6));
        assert_eq!(last[2].1, ParamValue::Float(0.1));
        assert_eq!(space.config_at(1)[2].1, ParamValue::Float(0.1));
    }

    #[test]
    fn test_keys_carry_model_prefix() {
        for spec in specs_for(TaskType::Regression) {
            for (name, _) in spec.search_space.dims() {
                assert!(name.starts_with(MODEL_STEP_PREFIX));
            }
        }
    }
}
