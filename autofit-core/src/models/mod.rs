//! Native estimators over dense `ndarray` matrices.
//!
//! Classifiers take class indices (`0.0`, `1.0`, ...) as labels and predict
//! class indices. Regressors predict target values.

pub mod boosting;
pub mod forest;
pub mod linalg;
pub mod linear;
pub mod params;
pub mod tree;

pub use boosting::{BoostParams, BoostedTrees, GrowthStrategy};
pub use forest::RandomForest;
pub use linear::{LinearRegression, LogisticRegression, Ridge};
pub use params::ParamValue;
pub use tree::DecisionTree;

use crate::error::ModelError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A trainable model.
pub trait Estimator: Send + Sync {
    /// Set one hyperparameter by its estimator-level name.
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError>;

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError>;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError>;
}

/// Model families known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LinearRegression,
    Ridge,
    LogisticRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
    HistGradientBoosting,
}

impl ModelFamily {
    /// Construct an untrained estimator.
    ///
    /// `n_classes == 0` selects the regression form of the family. `n_jobs`
    /// only affects families that parallelize internally.
    pub fn build(self, n_classes: usize, n_jobs: usize, seed: u64) -> Box<dyn Estimator> {
        let classify = n_classes > 0;
        match self {
            Self::LinearRegression => Box::new(LinearRegression::new()),
            Self::Ridge => Box::new(Ridge::default()),
            Self::LogisticRegression => Box::new(LogisticRegression::new(n_classes)),
            Self::DecisionTree if classify => Box::new(DecisionTree::classifier(n_classes, seed)),
            Self::DecisionTree => Box::new(DecisionTree::regressor(seed)),
            Self::RandomForest if classify => {
                Box::new(RandomForest::classifier(n_classes, n_jobs, seed))
            }
            Self::RandomForest => Box::new(RandomForest::regressor(n_jobs, seed)),
            Self::GradientBoosting => Box::new(BoostedTrees::gradient_boosting(n_classes, seed)),
            Self::HistGradientBoosting => {
                Box::new(BoostedTrees::hist_gradient_boosting(n_classes, seed))
            }
        }
    }
}

pub(crate) fn check_fit_input(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite {
            stage: "fit input".into(),
        });
    }
    Ok(())
}

pub(crate) fn check_predict_input(x: ArrayView2<f64>, n_features: usize) -> Result<(), ModelError> {
    if x.ncols() != n_features {
        return Err(ModelError::ShapeMismatch {
            expected: n_features,
            actual: x.ncols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn test_every_family_fits_and_predicts() {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| (i * (j + 1)) as f64);
        let y_reg = Array1::from_shape_fn(12, |i| i as f64 * 0.5);
        let y_cls = Array1::from_shape_fn(12, |i| f64::from(i >= 6));
        for family in [
            ModelFamily::LinearRegression,
            ModelFamily::Ridge,
            ModelFamily::DecisionTree,
            ModelFamily::RandomForest,
            ModelFamily::GradientBoosting,
            ModelFamily::HistGradientBoosting,
        ] {
            let mut model = family.build(0, 1, 42);
            model.fit(x.view(), y_reg.view()).unwrap();
            assert_eq!(model.predict(x.view()).unwrap().len(), 12, "{family:?}");
        }
        for family in [
            ModelFamily::LogisticRegression,
            ModelFamily::DecisionTree,
            ModelFamily::RandomForest,
            ModelFamily::GradientBoosting,
            ModelFamily::HistGradientBoosting,
        ] {
            let mut model = family.build(2, 1, 42);
            model.fit(x.view(), y_cls.view()).unwrap();
            let pred = model.predict(x.view()).unwrap();
            assert!(pred.iter().all(|&p| p == 0.0 || p == 1.0), "{family:?}");
        }
    }

    #[test]
    fn test_shape_checks() {
        let mut model = ModelFamily::Ridge.build(0, 1, 42);
        assert_eq!(
            model.fit(array![[1.0]].view(), array![1.0, 2.0].view()),
            Err(ModelError::LengthMismatch { rows: 1, labels: 2 })
        );
        model
            .fit(array![[1.0], [2.0]].view(), array![1.0, 2.0].view())
            .unwrap();
        assert!(matches!(
            model.predict(array![[1.0, 2.0]].view()),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
