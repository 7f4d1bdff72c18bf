//! CART decision trees (squared error or gini), shared by the forest.

use crate::error::ModelError;
use crate::models::linear::argmax;
use crate::models::params::ParamValue;
use crate::models::{Estimator, check_fit_input, check_predict_input};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

/// Split quality measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    SquaredError,
    Gini { n_classes: usize },
}

impl Criterion {
    fn output_len(self) -> usize {
        match self {
            Self::SquaredError => 1,
            Self::Gini { n_classes } => n_classes,
        }
    }
}

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    Sqrt,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            Self::All => n_features,
            Self::Sqrt => ((n_features as f64).sqrt() as usize).max(1).min(n_features),
        }
    }
}

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

impl TreeParams {
    /// Apply a tree hyperparameter; returns `false` for names it does not own.
    pub(crate) fn set(&mut self, name: &str, value: &ParamValue) -> Result<bool, ModelError> {
        match name {
            "max_depth" => self.max_depth = value.as_limit(name)?,
            "min_samples_split" => {
                let v = value.as_usize(name)?;
                if v < 2 {
                    return Err(ModelError::invalid_param(name, "must be at least 2"));
                }
                self.min_samples_split = v;
            }
            "min_samples_leaf" => {
                let v = value.as_usize(name)?;
                if v < 1 {
                    return Err(ModelError::invalid_param(name, "must be at least 1"));
                }
                self.min_samples_leaf = v;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Mean target (regression) or class distribution (classification).
    Leaf(Vec<f64>),
}

/// A fitted tree in flat node storage; the root is node 0.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl Tree {
    /// Grow a tree on the given rows of `x` (rows may repeat, as in a bootstrap).
    pub fn grow(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        rows: Vec<usize>,
        criterion: Criterion,
        params: &TreeParams,
        seed: u64,
    ) -> Self {
        let mut builder = Builder {
            x: x.view(),
            y: y.view(),
            criterion,
            params,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
        };
        builder.build(rows, 0);
        Self {
            nodes: builder.nodes,
            n_features: x.ncols(),
        }
    }

    /// Leaf output for one sample.
    pub fn leaf_value(&self, sample: ArrayView1<f64>) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count()
    }
}

struct Builder<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    criterion: Criterion,
    params: &'a TreeParams,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl Builder<'_> {
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf(self.leaf_value(&rows)));

        let depth_ok = self.params.max_depth.is_none_or(|d| depth < d);
        if !depth_ok || rows.len() < self.params.min_samples_split {
            return id;
        }
        let Some(best) = self.best_split(&rows) else {
            return id;
        };
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.x[[r, best.feature]] <= best.threshold);
        drop(rows);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn leaf_value(&self, rows: &[usize]) -> Vec<f64> {
        let n = rows.len().max(1) as f64;
        match self.criterion {
            Criterion::SquaredError => {
                vec![rows.iter().map(|&r| self.y[r]).sum::<f64>() / n]
            }
            Criterion::Gini { n_classes } => {
                let mut dist = vec![0.0; n_classes];
                for &r in rows {
                    if let Some(slot) = dist.get_mut(self.y[r] as usize) {
                        *slot += 1.0;
                    }
                }
                dist.iter_mut().for_each(|c| *c /= n);
                dist
            }
        }
    }

    /// Best split by impurity decrease. Higher `score` is better; a split must
    /// strictly reduce impurity.
    fn best_split(&mut self, rows: &[usize]) -> Option<Candidate> {
        let n_features = self.x.ncols();
        if n_features == 0 {
            return None;
        }
        let k = self.params.max_features.resolve(n_features);
        let features: Vec<usize> = if k == n_features {
            (0..n_features).collect()
        } else {
            sample(&mut self.rng, n_features, k).into_vec()
        };

        let min_leaf = self.params.min_samples_leaf;
        let parent = Stats::from_rows(self.criterion, self.y, rows);
        let parent_impurity = parent.weighted_impurity();
        let mut best: Option<Candidate> = None;
        let mut order = rows.to_vec();
        for feature in features {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let mut left = Stats::empty(self.criterion);
            let mut right = parent.clone();
            for i in 0..order.len() - 1 {
                let row = order[i];
                left.add(self.y[row]);
                right.remove(self.y[row]);
                let here = self.x[[row, feature]];
                let next = self.x[[order[i + 1], feature]];
                if here == next || i + 1 < min_leaf || order.len() - i - 1 < min_leaf {
                    continue;
                }
                let score = parent_impurity - left.weighted_impurity() - right.weighted_impurity();
                if score > 1e-12 && best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(Candidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        score,
                    });
                }
            }
        }
        best
    }
}

/// Running sufficient statistics for a node's impurity.
#[derive(Debug, Clone)]
enum Stats {
    Squared { n: f64, sum: f64, sum_sq: f64 },
    Counts { n: f64, counts: Vec<f64> },
}

impl Stats {
    fn empty(criterion: Criterion) -> Self {
        match criterion {
            Criterion::SquaredError => Self::Squared {
                n: 0.0,
                sum: 0.0,
                sum_sq: 0.0,
            },
            Criterion::Gini { .. } => Self::Counts {
                n: 0.0,
                counts: vec![0.0; criterion.output_len()],
            },
        }
    }

    fn from_rows(criterion: Criterion, y: ArrayView1<f64>, rows: &[usize]) -> Self {
        let mut stats = Self::empty(criterion);
        for &r in rows {
            stats.add(y[r]);
        }
        stats
    }

    fn add(&mut self, v: f64) {
        match self {
            Self::Squared { n, sum, sum_sq } => {
                *n += 1.0;
                *sum += v;
                *sum_sq += v * v;
            }
            Self::Counts { n, counts } => {
                *n += 1.0;
                if let Some(c) = counts.get_mut(v as usize) {
                    *c += 1.0;
                }
            }
        }
    }

    fn remove(&mut self, v: f64) {
        match self {
            Self::Squared { n, sum, sum_sq } => {
                *n -= 1.0;
                *sum -= v;
                *sum_sq -= v * v;
            }
            Self::Counts { n, counts } => {
                *n -= 1.0;
                if let Some(c) = counts.get_mut(v as usize) {
                    *c -= 1.0;
                }
            }
        }
    }

    /// Impurity times sample count (total SSE, or n * gini).
    fn weighted_impurity(&self) -> f64 {
        match self {
            Self::Squared { n, sum, sum_sq } => {
                if *n <= 0.0 {
                    0.0
                } else {
                    (sum_sq - sum * sum / n).max(0.0)
                }
            }
            Self::Counts { n, counts } => {
                if *n <= 0.0 {
                    0.0
                } else {
                    let sq: f64 = counts.iter().map(|c| (c / n).powi(2)).sum();
                    n * (1.0 - sq)
                }
            }
        }
    }
}

/// Single CART tree estimator.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    criterion: Criterion,
    params: TreeParams,
    seed: u64,
    tree: Option<Tree>,
}

impl DecisionTree {
    pub fn regressor(seed: u64) -> Self {
        Self {
            criterion: Criterion::SquaredError,
            params: TreeParams::default(),
            seed,
            tree: None,
        }
    }

    pub fn classifier(n_classes: usize, seed: u64) -> Self {
        Self {
            criterion: Criterion::Gini { n_classes },
            ..Self::regressor(seed)
        }
    }
}

impl Estimator for DecisionTree {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
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
        let rows = (0..x.nrows()).collect();
        self.tree = Some(Tree::grow(x, y, rows, self.criterion, &self.params, self.seed));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let tree = self.tree.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_input(x, tree.n_features())?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let value = tree.leaf_value(row);
                match self.criterion {
                    Criterion::SquaredError => value[0],
                    Criterion::Gini { .. } => argmax(ArrayView1::from(value)) as f64,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn test_regressor_fits_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        let mut tree = DecisionTree::regressor(42);
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap(), y);
        assert_eq!(tree.tree.as_ref().unwrap().n_leaves(), 2);
    }

    #[test]
    fn test_max_depth_zero_is_a_stump_leaf() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 4.0];
        let mut tree = DecisionTree::regressor(42);
        tree.set_param("max_depth", &ParamValue::Int(0)).unwrap();
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap(), array![2.0, 2.0]);
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_children() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 9.0];
        let mut tree = DecisionTree::regressor(42);
        tree.set_param("min_samples_leaf", &ParamValue::Int(2)).unwrap();
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.tree.as_ref().unwrap().n_leaves(), 1);
    }

    #[test]
    fn test_classifier_predicts_majority_class() {
        let x = array![[0.0, 1.0], [0.1, 1.0], [5.0, 0.0], [5.1, 0.0]];
        let y = array![0.0, 0.0, 2.0, 2.0];
        let mut tree = DecisionTree::classifier(3, 42);
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_zero_features_predicts_mean() {
        let x = Array2::<f64>::zeros((3, 0));
        let y = array![1.0, 2.0, 3.0];
        let mut tree = DecisionTree::regressor(42);
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap(), array![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_invalid_min_samples_split() {
        let mut tree = DecisionTree::regressor(42);
        assert!(tree
            .set_param("min_samples_split", &ParamValue::Int(1))
            .is_err());
    }
}
