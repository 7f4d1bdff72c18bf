//! Second-order gradient boosted trees over quantized features.
//!
//! Both boosted families share one trainer. They differ in the growth
//! strategy and defaults:
//!
//! - `GradientBoosting` grows depth-wise (all nodes of a level are expanded
//!   before the next level) and regularizes leaves with `reg_lambda = 1`.
//! - `HistGradientBoosting` grows leaf-wise (always the leaf with the best
//!   gain) up to `num_leaves`, with a minimum of 20 rows per child.
//!
//! Gain and leaf weights follow the usual second-order formulas:
//!
//! ```text
//! gain   = ½ · [T(G_L)²/(H_L+λ) + T(G_R)²/(H_R+λ) − T(G)²/(H+λ)]
//! weight = −T(G) / (H + λ)
//! ```
//!
//! where `T` soft-thresholds the gradient sum by `reg_alpha`.

use crate::error::ModelError;
use crate::models::linear::argmax;
use crate::models::params::ParamValue;
use crate::models::{Estimator, check_fit_input, check_predict_input};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

/// Upper bound on bins per feature.
const MAX_BINS: usize = 256;

/// How a tree is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthStrategy {
    /// Expand every splittable node of a level before going deeper.
    DepthWise,
    /// Expand the leaf with the highest gain first.
    LeafWise,
}

/// Training objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    Squared,
    Logistic,
}

impl Loss {
    fn grad_hess(self, pred: f64, target: f64) -> (f64, f64) {
        match self {
            Loss::Squared => (pred - target, 1.0),
            Loss::Logistic => {
                let p = sigmoid(pred);
                (p - target, (p * (1.0 - p)).max(1e-16))
            }
        }
    }

    fn base_score(self, y: &[f64]) -> f64 {
        let n = y.len().max(1) as f64;
        let mean = y.iter().sum::<f64>() / n;
        match self {
            Loss::Squared => mean,
            Loss::Logistic => {
                let p = mean.clamp(1e-6, 1.0 - 1e-6);
                (p / (1.0 - p)).ln()
            }
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

/// Hyperparameters shared by both boosted families.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostParams {
    pub growth: GrowthStrategy,
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: Option<usize>,
    /// Only honored by leaf-wise growth.
    pub num_leaves: usize,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
}

impl BoostParams {
    pub fn depth_wise() -> Self {
        Self {
            growth: GrowthStrategy::DepthWise,
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: Some(6),
            num_leaves: usize::MAX,
            min_child_samples: 1,
            min_child_weight: 1.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
        }
    }

    pub fn leaf_wise() -> Self {
        Self {
            growth: GrowthStrategy::LeafWise,
            num_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            min_child_weight: 1e-3,
            reg_lambda: 0.0,
            ..Self::depth_wise()
        }
    }

    fn set(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "n_estimators" => {
                self.n_estimators = value.as_usize(name)?;
                if self.n_estimators == 0 {
                    return Err(ModelError::invalid_param(name, "must be at least 1"));
                }
            }
            "learning_rate" => {
                self.learning_rate = value.as_f64(name)?;
                if self.learning_rate <= 0.0 {
                    return Err(ModelError::invalid_param(name, "must be positive"));
                }
            }
            "max_depth" => self.max_depth = value.as_limit(name)?,
            "num_leaves" if self.growth == GrowthStrategy::LeafWise => {
                self.num_leaves = value.as_usize(name)?;
                if self.num_leaves < 2 {
                    return Err(ModelError::invalid_param(name, "must be at least 2"));
                }
            }
            "min_child_samples" => self.min_child_samples = value.as_usize(name)?.max(1),
            "min_child_weight" => self.min_child_weight = value.as_f64(name)?.max(0.0),
            "subsample" => self.subsample = value.as_fraction(name)?,
            "colsample_bytree" => self.colsample_bytree = value.as_fraction(name)?,
            "reg_alpha" => self.reg_alpha = value.as_f64(name)?.max(0.0),
            "reg_lambda" => self.reg_lambda = value.as_f64(name)?.max(0.0),
            _ => {
                return Err(ModelError::UnknownParam {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        soft_threshold(g, self.reg_alpha).powi(2) / denom
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -soft_threshold(g, self.reg_alpha) / denom * self.learning_rate
    }
}

/// Per-feature bin boundaries learned from the training matrix.
#[derive(Debug, Clone)]
struct BinMapper {
    edges: Vec<Vec<f64>>,
}

impl BinMapper {
    fn fit(x: ArrayView2<f64>) -> Self {
        let edges = x
            .columns()
            .into_iter()
            .map(|col| {
                let mut uniq: Vec<f64> = col.to_vec();
                uniq.sort_by(f64::total_cmp);
                uniq.dedup();
                let mids: Vec<f64> = uniq.windows(2).map(|w| w[0] + (w[1] - w[0]) / 2.0).collect();
                if mids.len() < MAX_BINS {
                    return mids;
                }
                let mut picked: Vec<f64> = (1..MAX_BINS)
                    .map(|i| mids[i * mids.len() / MAX_BINS])
                    .collect();
                picked.dedup();
                picked
            })
            .collect();
        Self { edges }
    }

    /// Column-major bin indices.
    fn transform(&self, x: ArrayView2<f64>) -> Vec<Vec<u16>> {
        self.edges
            .iter()
            .zip(x.columns())
            .map(|(edges, col)| {
                col.iter()
                    .map(|&v| edges.partition_point(|&e| e < v) as u16)
                    .collect()
            })
            .collect()
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
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(w) => return w,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[feature] <= threshold { left } else { right },
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitInfo {
    feature: usize,
    bin: usize,
    gain: f64,
}

/// A leaf that can still be split.
struct Expandable {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: SplitInfo,
}

struct Grower<'a> {
    bins: &'a [Vec<u16>],
    mapper: &'a BinMapper,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a BoostParams,
}

impl Grower<'_> {
    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]))
    }

    fn find_split(&self, rows: &[usize], depth: usize) -> Option<SplitInfo> {
        if self.params.max_depth.is_some_and(|d| depth >= d)
            || rows.len() < 2 * self.params.min_child_samples
        {
            return None;
        }
        let (g_total, h_total) = self.sums(rows);
        let parent = self.params.score(g_total, h_total);
        let mut best: Option<SplitInfo> = None;
        for &feature in self.features {
            let n_edges = self.mapper.edges[feature].len();
            if n_edges == 0 {
                continue;
            }
            let mut hist = vec![(0.0_f64, 0.0_f64, 0_usize); n_edges + 1];
            let col = &self.bins[feature];
            for &r in rows {
                let slot = &mut hist[col[r] as usize];
                slot.0 += self.grad[r];
                slot.1 += self.hess[r];
                slot.2 += 1;
            }
            let (mut gl, mut hl, mut nl) = (0.0, 0.0, 0);
            for (bin, &(g, h, n)) in hist.iter().enumerate().take(n_edges) {
                gl += g;
                hl += h;
                nl += n;
                let nr = rows.len() - nl;
                let (gr, hr) = (g_total - gl, h_total - hl);
                if nl < self.params.min_child_samples || nr < self.params.min_child_samples {
                    continue;
                }
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }
                let gain =
                    0.5 * (self.params.score(gl, hl) + self.params.score(gr, hr) - parent);
                if gain > 1e-12 && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitInfo { feature, bin, gain });
                }
            }
        }
        best
    }

    fn grow(&self, rows: Vec<usize>) -> RegressionTree {
        let (g, h) = self.sums(&rows);
        let mut nodes = vec![Node::Leaf(self.params.leaf_weight(g, h))];
        let mut frontier: Vec<Expandable> = Vec::new();
        if let Some(split) = self.find_split(&rows, 0) {
            frontier.push(Expandable {
                node: 0,
                rows,
                depth: 0,
                split,
            });
        }
        let mut n_leaves = 1;
        while !frontier.is_empty() && n_leaves < self.params.num_leaves {
            let pick = match self.params.growth {
                GrowthStrategy::DepthWise => 0,
                GrowthStrategy::LeafWise => frontier
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.split.gain.total_cmp(&b.1.split.gain))
                    .map_or(0, |(i, _)| i),
            };
            let Expandable {
                node,
                rows,
                depth,
                split,
            } = frontier.remove(pick);

            let col = &self.bins[split.feature];
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                rows.into_iter().partition(|&r| usize::from(col[r]) <= split.bin);
            let left = nodes.len();
            let right = left + 1;
            for child_rows in [&left_rows, &right_rows] {
                let (g, h) = self.sums(child_rows);
                nodes.push(Node::Leaf(self.params.leaf_weight(g, h)));
            }
            nodes[node] = Node::Split {
                feature: split.feature,
                threshold: self.mapper.edges[split.feature][split.bin],
                left,
                right,
            };
            n_leaves += 1;

            for (child, child_rows) in [(left, left_rows), (right, right_rows)] {
                if let Some(split) = self.find_split(&child_rows, depth + 1) {
                    frontier.push(Expandable {
                        node: child,
                        rows: child_rows,
                        depth: depth + 1,
                        split,
                    });
                }
            }
        }
        RegressionTree { nodes }
    }
}

/// One additive ensemble producing a raw margin.
#[derive(Debug, Clone)]
struct Ensemble {
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl Ensemble {
    fn fit(
        x: ArrayView2<f64>,
        target: &[f64],
        loss: Loss,
        params: &BoostParams,
        mapper: &BinMapper,
        bins: &[Vec<u16>],
        seed: u64,
    ) -> Self {
        let (n, p) = x.dim();
        let base_score = loss.base_score(target);
        let mut pred = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut rng = StdRng::seed_from_u64(seed);
        let n_rows = ((n as f64 * params.subsample).ceil() as usize).clamp(1, n);
        let n_cols = ((p as f64 * params.colsample_bytree).ceil() as usize).min(p);
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for i in 0..n {
                (grad[i], hess[i]) = loss.grad_hess(pred[i], target[i]);
            }
            let rows: Vec<usize> = if n_rows < n {
                let mut rows = sample(&mut rng, n, n_rows).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };
            let features: Vec<usize> = if n_cols < p {
                sample(&mut rng, p, n_cols.max(1)).into_vec()
            } else {
                (0..p).collect()
            };
            let grower = Grower {
                bins,
                mapper,
                grad: &grad,
                hess: &hess,
                features: &features,
                params,
            };
            let tree = grower.grow(rows);
            for (i, row) in x.rows().into_iter().enumerate() {
                pred[i] += tree.predict_row(row);
            }
            trees.push(tree);
        }
        Self { base_score, trees }
    }

    fn margin(&self, row: ArrayView1<f64>) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

/// Boosted-tree estimator. Regression when `n_classes == 0`; otherwise
/// binary logistic, or one-vs-rest logistic for more than two classes.
#[derive(Debug, Clone)]
pub struct BoostedTrees {
    params: BoostParams,
    n_classes: usize,
    seed: u64,
    n_features: usize,
    ensembles: Vec<Ensemble>,
}

impl BoostedTrees {
    pub fn new(params: BoostParams, n_classes: usize, seed: u64) -> Self {
        Self {
            params,
            n_classes,
            seed,
            n_features: 0,
            ensembles: Vec::new(),
        }
    }

    /// Depth-wise variant.
    pub fn gradient_boosting(n_classes: usize, seed: u64) -> Self {
        Self::new(BoostParams::depth_wise(), n_classes, seed)
    }

    /// Leaf-wise variant.
    pub fn hist_gradient_boosting(n_classes: usize, seed: u64) -> Self {
        Self::new(BoostParams::leaf_wise(), n_classes, seed)
    }

    pub fn params(&self) -> &BoostParams {
        &self.params
    }
}

impl Estimator for BoostedTrees {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        self.params.set(name, value)
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let mapper = BinMapper::fit(x);
        let bins = mapper.transform(x);
        let y = y.to_vec();
        let ensembles = match self.n_classes {
            0 => vec![Ensemble::fit(x, &y, Loss::Squared, &self.params, &mapper, &bins, self.seed)],
            2 => {
                let target: Vec<f64> = y.iter().map(|&v| f64::from(v == 1.0)).collect();
                vec![Ensemble::fit(x, &target, Loss::Logistic, &self.params, &mapper, &bins, self.seed)]
            }
            k => (0..k)
                .map(|class| {
                    let target: Vec<f64> =
                        y.iter().map(|&v| f64::from(v == class as f64)).collect();
                    Ensemble::fit(
                        x,
                        &target,
                        Loss::Logistic,
                        &self.params,
                        &mapper,
                        &bins,
                        self.seed.wrapping_add(class as u64),
                    )
                })
                .collect(),
        };
        if ensembles
            .iter()
            .flat_map(|e| &e.trees)
            .flat_map(|t| &t.nodes)
            .any(|n| matches!(n, Node::Leaf(w) if !w.is_finite()))
        {
            return Err(ModelError::NonFinite {
                stage: "boosting fit".into(),
            });
        }
        self.n_features = x.ncols();
        self.ensembles = ensembles;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        if self.ensembles.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_predict_input(x, self.n_features)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| match self.n_classes {
                0 => self.ensembles[0].margin(row),
                2 => f64::from(self.ensembles[0].margin(row) > 0.0),
                _ => {
                    let margins: Array1<f64> =
                        self.ensembles.iter().map(|e| e.margin(row)).collect();
                    argmax(margins.view()) as f64
                }
            })
            .collect())
    }
}
