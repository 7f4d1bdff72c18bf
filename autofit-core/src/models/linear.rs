//! Linear models: least squares, ridge, and multinomial logistic regression.

use crate::error::ModelError;
use crate::models::linalg::ridge_solve;
use crate::models::params::ParamValue;
use crate::models::{Estimator, check_fit_input, check_predict_input};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Penalty used by plain least squares so collinear features still solve
/// (approaching the minimum-norm solution).
const LSTSQ_JITTER: f64 = 1e-8;

#[derive(Debug, Clone)]
struct LinearFit {
    weights: Array1<f64>,
    intercept: f64,
}

impl LinearFit {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        check_predict_input(x, self.weights.len())?;
        Ok(x.dot(&self.weights) + self.intercept)
    }
}

/// Ordinary least squares with an intercept.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    fit: Option<LinearFit>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Estimator for LinearRegression {
    fn set_param(&mut self, name: &str, _value: &ParamValue) -> Result<(), ModelError> {
        Err(ModelError::UnknownParam {
            name: name.to_string(),
        })
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let (weights, intercept) = ridge_solve(x, y, LSTSQ_JITTER)?;
        self.fit = Some(LinearFit { weights, intercept });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.fit.as_ref().ok_or(ModelError::NotFitted)?.predict(x)
    }
}

/// Least squares with an L2 penalty on the weights.
#[derive(Debug, Clone)]
pub struct Ridge {
    alpha: f64,
    fit: Option<LinearFit>,
}

impl Default for Ridge {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit: None,
        }
    }
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, fit: None }
    }
}

impl Estimator for Ridge {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "alpha" => {
                let alpha = value.as_f64(name)?;
                if alpha < 0.0 {
                    return Err(ModelError::invalid_param(name, "must be non-negative"));
                }
                self.alpha = alpha;
                Ok(())
            }
            _ => Err(ModelError::UnknownParam {
                name: name.to_string(),
            }),
        }
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let (weights, intercept) = ridge_solve(x, y, self.alpha.max(LSTSQ_JITTER))?;
        self.fit = Some(LinearFit { weights, intercept });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.fit.as_ref().ok_or(ModelError::NotFitted)?.predict(x)
    }
}

/// Multinomial logistic regression with an L2 penalty (inverse strength `c`),
/// fit by full-batch gradient descent. Predicts class indices.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    n_classes: usize,
    c: f64,
    max_iter: usize,
    tol: f64,
    weights: Option<(Array2<f64>, Array1<f64>)>,
}

impl LogisticRegression {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes: n_classes.max(2),
            c: 1.0,
            max_iter: 500,
            tol: 1e-6,
            weights: None,
        }
    }

    fn logits(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
        let (w, b) = self.weights.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_input(x, w.nrows())?;
        Ok(x.dot(w) + b)
    }
}

fn softmax_rows(mut z: Array2<f64>) -> Array2<f64> {
    for mut row in z.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    z
}

impl Estimator for LogisticRegression {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "C" => {
                let c = value.as_f64(name)?;
                if c <= 0.0 {
                    return Err(ModelError::invalid_param(name, "must be positive"));
                }
                self.c = c;
                Ok(())
            }
            "max_iter" => {
                self.max_iter = value.as_usize(name)?;
                Ok(())
            }
            _ => Err(ModelError::UnknownParam {
                name: name.to_string(),
            }),
        }
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let (n, p) = x.dim();
        let k = self.n_classes;
        let mut onehot = Array2::<f64>::zeros((n, k));
        for (i, &label) in y.iter().enumerate() {
            let class = label as usize;
            if class >= k {
                return Err(ModelError::invalid_param(
                    "y",
                    format!("class index {class} out of range for {k} classes"),
                ));
            }
            onehot[[i, class]] = 1.0;
        }

        let lambda = 1.0 / (self.c * n as f64);
        let max_sq_norm = x
            .rows()
            .into_iter()
            .map(|r| r.dot(&r))
            .fold(0.0_f64, f64::max);
        let step = 1.0 / (0.5 * (max_sq_norm + 1.0) + lambda);

        let mut w = Array2::<f64>::zeros((p, k));
        let mut b = Array1::<f64>::zeros(k);
        for _ in 0..self.max_iter {
            let probs = softmax_rows(x.dot(&w) + &b);
            let residual = (probs - &onehot) / n as f64;
            let grad_w = x.t().dot(&residual) + &w * lambda;
            let grad_b = residual.sum_axis(Axis(0));
            w.scaled_add(-step, &grad_w);
            b.scaled_add(-step, &grad_b);
            let norm = grad_w.iter().chain(grad_b.iter()).map(|g| g * g).sum::<f64>();
            if norm.sqrt() < self.tol {
                break;
            }
        }
        if w.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite {
                stage: "logistic regression fit".into(),
            });
        }
        self.weights = Some((w, b));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let logits = self.logits(x)?;
        Ok(logits
            .rows()
            .into_iter()
            .map(|row| argmax(row) as f64)
            .collect())
    }
}

/// Index of the largest value; the first one wins ties.
pub(crate) fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression_handles_collinear_features() {
        let x = array![[1.0, 2.0], [2.0, 3.0], [3.0, 4.0]];
        let y = array![2.0, 4.0, 6.0];
        let mut model = LinearRegression::new();
        model.fit(x.view(), y.view()).unwrap();
        let pred = model.predict(x.view()).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_ridge_shrinks_weights() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![0.0, 1.0, 2.0];
        let mut weak = Ridge::new(0.01);
        let mut strong = Ridge::new(10.0);
        weak.fit(x.view(), y.view()).unwrap();
        strong.fit(x.view(), y.view()).unwrap();
        let query = array![[2.0]];
        let a = weak.predict(query.view()).unwrap()[0];
        let b = strong.predict(query.view()).unwrap()[0];
        assert!(a > b);
    }

    #[test]
    fn test_ridge_rejects_unknown_param() {
        let mut model = Ridge::default();
        assert!(matches!(
            model.set_param("gamma", &ParamValue::Float(1.0)),
            Err(ModelError::UnknownParam { .. })
        ));
    }

    #[test]
    fn test_logistic_separates_classes() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = LogisticRegression::new(2);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = LogisticRegression::new(3);
        assert_eq!(
            model.predict(array![[1.0]].view()),
            Err(ModelError::NotFitted)
        );
    }
}
