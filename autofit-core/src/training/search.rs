//! Randomized hyperparameter search with k-fold cross-validation.

use crate::data::Dataset;
use crate::error::ModelError;
use crate::models::ParamValue;
use crate::registry::SearchSpace;
use crate::task::{Metric, TaskType};
use crate::training::metrics;
use crate::training::pipeline::Pipeline;
use ndarray::{Array1, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use std::collections::BTreeMap;

pub type ParamConfig = Vec<(String, ParamValue)>;

/// Pick the configurations to evaluate.
///
/// A grid no larger than `budget` is evaluated whole, in grid order.
/// Otherwise `budget` distinct configurations are drawn with a seeded RNG.
pub fn sample_configs(space: &SearchSpace, budget: usize, seed: u64) -> Vec<ParamConfig> {
    let size = space.size();
    if size <= budget {
        return (0..size).map(|i| space.config_at(i)).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    sample(&mut rng, size, budget)
        .into_iter()
        .map(|i| space.config_at(i))
        .collect()
}

/// A train/validation index pair.
pub type Fold = (Vec<usize>, Vec<usize>);

/// Contiguous, unshuffled folds; the first `n % k` folds get one extra row.
pub fn kfold(n: usize, k: usize) -> Vec<Fold> {
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for f in 0..k {
        let size = n / k + usize::from(f < n % k);
        let test: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..start).chain(start + size..n).collect();
        folds.push((train, test));
        start += size;
    }
    folds
}

/// Folds that spread each class evenly: rows are grouped by class and dealt
/// round-robin across folds.
pub fn stratified_kfold(y: &[f64], k: usize) -> Vec<Fold> {
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        by_class.entry(label.round() as i64).or_default().push(i);
    }
    let mut assignment = vec![0; y.len()];
    for (pos, &row) in by_class.values().flatten().enumerate() {
        assignment[row] = pos % k;
    }
    (0..k)
        .map(|f| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| assignment[i] == f);
            (train, test)
        })
        .collect()
}

/// Cross-validation folds for `task`, with `k` clamped to the row count.
pub fn cv_folds(task: TaskType, y: &[f64], k: usize) -> Result<Vec<Fold>, ModelError> {
    let n = y.len();
    if n < 2 {
        return Err(ModelError::invalid_param(
            "cv",
            format!("cross-validation needs at least 2 rows, got {n}"),
        ));
    }
    let k = k.clamp(2, n);
    Ok(match task {
        TaskType::Regression => kfold(n, k),
        TaskType::Classification => stratified_kfold(y, k),
    })
}

/// One evaluated configuration.
#[derive(Debug, Clone)]
pub struct CvResult {
    pub params: ParamConfig,
    /// Mean search score across folds (higher is better).
    pub mean_score: f64,
}

/// Outcome of a search: every evaluated configuration plus the winner.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<CvResult>,
    pub best_index: usize,
}

impl SearchOutcome {
    pub fn best(&self) -> &CvResult {
        &self.results[self.best_index]
    }
}

/// Inputs shared by every configuration of one search.
pub struct SearchContext<'a> {
    pub pipeline: Pipeline<'a>,
    pub metric: Metric,
    pub n_classes: usize,
    pub folds: Vec<Fold>,
}

/// Evaluate `configs` by cross-validation and keep the best mean search
/// score. Ties keep the earliest configuration.
pub fn run_search(
    ctx: &SearchContext<'_>,
    x: &Dataset,
    y: &Array1<f64>,
    configs: Vec<ParamConfig>,
) -> Result<SearchOutcome, ModelError> {
    let mut results = Vec::with_capacity(configs.len());
    let mut best_index = 0;
    for params in configs {
        let candidate = ctx.pipeline.clone().with_params(params.clone());
        let mut total = 0.0;
        for (train_idx, test_idx) in &ctx.folds {
            let fitted = candidate.fit(&x.take(train_idx), y.select(Axis(0), train_idx).view())?;
            let pred = fitted.predict(&x.take(test_idx))?;
            let truth = y.select(Axis(0), test_idx);
            let native = metrics::score(ctx.metric, &truth.to_vec(), &pred.to_vec(), ctx.n_classes);
            total += ctx.metric.to_search_score(native);
        }
        let mean_score = total / ctx.folds.len().max(1) as f64;
        if !mean_score.is_finite() {
            return Err(ModelError::NonFinite {
                stage: "cross-validation".into(),
            });
        }
        tracing::debug!(params = ?params, score = mean_score, "Evaluated configuration");
        if results
            .get(best_index)
            .is_some_and(|b: &CvResult| mean_score > b.mean_score)
        {
            best_index = results.len();
        }
        results.push(CvResult { params, mean_score });
    }
    if results.is_empty() {
        return Err(ModelError::invalid_param("search", "no configurations to evaluate"));
    }
    Ok(SearchOutcome {
        results,
        best_index,
    })
}
