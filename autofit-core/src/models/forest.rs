//! Random forest: bootstrap-aggregated CART trees.

use crate::error::ModelError;
use crate::models::linear::argmax;
use crate::models::params::ParamValue;
use crate::models::tree::{Criterion, MaxFeatures, Tree, TreeParams};
use crate::models::{Estimator, check_fit_input, check_predict_input};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct RandomForest {
    criterion: Criterion,
    n_estimators: usize,
    params: TreeParams,
    n_jobs: usize,
    seed: u64,
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Regression forest; every split considers all features.
    pub fn regressor(n_jobs: usize, seed: u64) -> Self {
        Self {
            criterion: Criterion::SquaredError,
            n_estimators: 100,
            params: TreeParams::default(),
            n_jobs: n_jobs.max(1),
            seed,
            trees: Vec::new(),
        }
    }

    /// Classification forest; each split considers `sqrt(n_features)` features.
    pub fn classifier(n_classes: usize, n_jobs: usize, seed: u64) -> Self {
        Self {
            criterion: Criterion::Gini { n_classes },
            params: TreeParams {
                max_features: MaxFeatures::Sqrt,
                ..TreeParams::default()
            },
            ..Self::regressor(n_jobs, seed)
        }
    }

    fn grow_tree(&self, x: ArrayView2<f64>, y: ArrayView1<f64>, index: usize) -> Tree {
        let tree_seed = self.seed.wrapping_add(index as u64);
        let mut rng = StdRng::seed_from_u64(tree_seed);
        let n = x.nrows();
        let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        Tree::grow(x, y, rows, self.criterion, &self.params, tree_seed)
    }

    fn averaged(&self, sample: ArrayView1<f64>) -> Vec<f64> {
        let mut acc = vec![0.0; self.trees.first().map_or(1, |t| t.leaf_value(sample).len())];
        for tree in &self.trees {
            for (a, v) in acc.iter_mut().zip(tree.leaf_value(sample)) {
                *a += v;
            }
        }
        let n = self.trees.len().max(1) as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }
}

impl Estimator for RandomForest {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        if name == "n_estimators" {
            let n = value.as_usize(name)?;
            if n == 0 {
                return Err(ModelError::invalid_param(name, "must be at least 1"));
            }
            self.n_estimators = n;
            return Ok(());
        }
        if self.params.set(name, value)? {
            Ok(())
        } else {
            Err(ModelError::UnknownParam {
                name: name.to_string(),
            })
        }
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let trees: Vec<Tree> = if self.n_jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_jobs)
                .build()
                .map_err(|e| ModelError::invalid_param("n_jobs", e.to_string()))?;
            pool.install(|| {
                (0..self.n_estimators)
                    .into_par_iter()
                    .map(|i| self.grow_tree(x, y, i))
                    .collect()
            })
        } else {
            (0..self.n_estimators)
                .map(|i| self.grow_tree(x, y, i))
                .collect()
        };
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let first = self.trees.first().ok_or(ModelError::NotFitted)?;
        check_predict_input(x, first.n_features())?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let avg = self.averaged(row);
                match self.criterion {
                    Criterion::SquaredError => avg[0],
                    Criterion::Gini { .. } => argmax(ArrayView1::from(&avg)) as f64,
                }
            })
            .collect())
    }
}
