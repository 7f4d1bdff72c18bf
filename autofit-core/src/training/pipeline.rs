//! Preprocessing followed by one estimator, fit as a unit.

use crate::data::Dataset;
use crate::error::ModelError;
use crate::models::{Estimator, ModelFamily, ParamValue};
use crate::preprocess::{FittedPreprocessor, PreprocessingPlan};
use crate::registry::MODEL_STEP_PREFIX;
use ndarray::{Array1, ArrayView1};

/// An unfitted pipeline: plan + model family + step-prefixed params.
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    plan: &'a PreprocessingPlan,
    family: ModelFamily,
    n_classes: usize,
    n_jobs: usize,
    seed: u64,
    params: Vec<(String, ParamValue)>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        plan: &'a PreprocessingPlan,
        family: ModelFamily,
        n_classes: usize,
        n_jobs: usize,
        seed: u64,
    ) -> Self {
        Self {
            plan,
            family,
            n_classes,
            n_jobs,
            seed,
            params: Vec::new(),
        }
    }

    /// Replace the pipeline params; keys must carry a step prefix.
    pub fn with_params(mut self, params: Vec<(String, ParamValue)>) -> Self {
        self.params = params;
        self
    }

    /// Fit preprocessing on `x` only, then the estimator on the transformed rows.
    pub fn fit(&self, x: &Dataset, y: ArrayView1<f64>) -> Result<FittedPipeline, ModelError> {
        let mut estimator = self.family.build(self.n_classes, self.n_jobs, self.seed);
        for (key, value) in &self.params {
            let name = key
                .strip_prefix(MODEL_STEP_PREFIX)
                .ok_or_else(|| ModelError::UnknownParam { name: key.clone() })?;
            estimator.set_param(name, value)?;
        }
        let preprocessor = self.plan.fit(x)?;
        let features = preprocessor.transform(x)?;
        estimator.fit(features.view(), y)?;
        Ok(FittedPipeline {
            preprocessor,
            estimator,
        })
    }
}

/// A pipeline whose preprocessing and estimator are both fitted.
pub struct FittedPipeline {
    preprocessor: FittedPreprocessor,
    estimator: Box<dyn Estimator>,
}

impl FittedPipeline {
    pub fn predict(&self, x: &Dataset) -> Result<Array1<f64>, ModelError> {
        let features = self.preprocessor.transform(x)?;
        self.estimator.predict(features.view())
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }
}

impl std::fmt::Debug for FittedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedPipeline")
            .field("n_features", &self.preprocessor.n_features())
            .finish_non_exhaustive()
    }
}

/// Strip the step prefix from reported param names.
pub fn strip_step_prefix(params: &[(String, ParamValue)]) -> Vec<(String, ParamValue)> {
    params
        .iter()
        .map(|(k, v)| {
            let name = k.strip_prefix(MODEL_STEP_PREFIX).unwrap_or(k);
            (name.to_string(), v.clone())
        })
        .collect()
}
