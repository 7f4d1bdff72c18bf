//! Single-model trainer: fit (optionally via randomized search) and evaluate
//! one pipeline, producing a [`TrainingResult`].

use crate::config::TrainingConfig;
use crate::data::{Dataset, Split};
use crate::error::{ModelError, ModelTrainingError};
use crate::models::ParamValue;
use crate::preprocess::PreprocessingPlan;
use crate::registry::ModelSpec;
use crate::task::{Metric, TaskType};
use crate::training::metrics;
use crate::training::pipeline::{Pipeline, strip_step_prefix};
use crate::training::search::{SearchContext, cv_folds, run_search, sample_configs};
use crate::training::target::EncodedTarget;
use ndarray::{Array1, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized outcome of training one model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub model_name: String,
    /// Metric `best_score` is measured in.
    pub metric: Metric,
    /// Native metric value: cross-validation score when a search ran,
    /// held-out test score otherwise.
    pub best_score: f64,
    /// Leading test-set predictions.
    pub predictions: Vec<f64>,
    /// Winning hyperparameters; present only if a search ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, ParamValue>>,
    /// Class labels indexed by the predictions, for non-numeric targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
}

impl TrainingResult {
    /// `best_score` on the always-maximized scale, comparable across metrics.
    pub fn search_score(&self) -> f64 {
        self.metric.to_search_score(self.best_score)
    }
}

/// Everything a trainer reads. Built once per job and shared read-only.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub task: TaskType,
    pub split: Split,
    pub target: EncodedTarget,
    pub plan: PreprocessingPlan,
}

impl TrainingData {
    pub fn n_classes(&self) -> usize {
        self.target.n_classes()
    }
}

/// Train and evaluate one model. Any failure is tagged with the model name.
pub fn train(
    spec: &ModelSpec,
    data: &TrainingData,
    config: &TrainingConfig,
) -> Result<TrainingResult, ModelTrainingError> {
    train_inner(spec, data, config).map_err(|e| ModelTrainingError::new(spec.name, e))
}

fn train_inner(
    spec: &ModelSpec,
    data: &TrainingData,
    config: &TrainingConfig,
) -> Result<TrainingResult, ModelError> {
    let (x_train, y_train) = training_rows(spec, data, config);
    let n_classes = data.n_classes();
    let pipeline = Pipeline::new(
        &data.plan,
        spec.family,
        n_classes,
        config.model_threads,
        config.random_seed,
    );

    let (fitted, best_score, params) = if spec.search_space.is_empty() {
        let fitted = pipeline.fit(&x_train, y_train.view())?;
        let pred = fitted.predict(&data.split.x_test)?;
        let score = metrics::score(
            spec.metric,
            &data.target.test.to_vec(),
            &pred.to_vec(),
            n_classes,
        );
        (fitted, score, None)
    } else {
        let folds = cv_folds(data.task, &y_train.to_vec(), config.cv_folds)?;
        let configs = sample_configs(
            &spec.search_space,
            config.search_iterations,
            config.random_seed,
        );
        let ctx = SearchContext {
            pipeline: pipeline.clone(),
            metric: spec.metric,
            n_classes,
            folds,
        };
        let outcome = run_search(&ctx, &x_train, &y_train, configs)?;
        let best = outcome.best();
        let fitted = pipeline
            .with_params(best.params.clone())
            .fit(&x_train, y_train.view())?;
        let reported: BTreeMap<String, ParamValue> =
            strip_step_prefix(&best.params).into_iter().collect();
        (
            fitted,
            spec.metric.from_search_score(best.mean_score),
            Some(reported),
        )
    };

    if !best_score.is_finite() {
        return Err(ModelError::NonFinite {
            stage: "scoring".into(),
        });
    }

    let test_pred = fitted.predict(&data.split.x_test)?;
    let mut predictions = data.target.decode(&test_pred.to_vec());
    predictions.truncate(config.prediction_sample_size);
    let classes = data
        .target
        .classes
        .as_ref()
        .filter(|c| !c.is_numeric())
        .map(|c| c.labels().to_vec());

    Ok(TrainingResult {
        model_name: spec.name.to_string(),
        metric: spec.metric,
        best_score,
        predictions,
        params,
        classes,
    })
}

/// Training rows for `spec`: subsampled to the threshold for families that
/// scale poorly, the full training set otherwise.
fn training_rows(
    spec: &ModelSpec,
    data: &TrainingData,
    config: &TrainingConfig,
) -> (Dataset, Array1<f64>) {
    let n = data.split.n_train();
    let threshold = config.subsample_threshold;
    if !spec.scales_poorly || threshold == 0 || n <= threshold {
        return (data.split.x_train.clone(), data.target.train.clone());
    }
    tracing::warn!(
        model = spec.name,
        rows = n,
        threshold,
        "Subsampling training set"
    );
    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let mut rows = sample(&mut rng, n, threshold).into_vec();
    rows.sort_unstable();
    (
        data.split.x_train.take(&rows),
        data.target.train.select(Axis(0), &rows),
    )
}
