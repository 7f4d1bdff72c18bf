//! Small dense linear algebra helpers.

use crate::error::ModelError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(ModelError::ShapeMismatch {
            expected: n,
            actual: b.len(),
        });
    }
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(ModelError::Singular);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

/// Column means of `x`; zeros for an empty matrix.
pub fn column_means(x: ArrayView2<f64>) -> Array1<f64> {
    x.mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()))
}

/// Fit centered least squares with an L2 penalty `alpha` on the weights.
///
/// Returns `(weights, intercept)`. The intercept is not penalized.
pub fn ridge_solve(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    alpha: f64,
) -> Result<(Array1<f64>, f64), ModelError> {
    let x_mean = column_means(x);
    let y_mean = y.mean().unwrap_or(0.0);
    let xc = &x - &x_mean;
    let yc = &y - y_mean;
    let mut gram = xc.t().dot(&xc);
    for i in 0..gram.nrows() {
        gram[[i, i]] += alpha;
    }
    let rhs = xc.t().dot(&yc);
    let weights = solve(gram, rhs)?;
    let intercept = y_mean - x_mean.dot(&weights);
    Ok((weights, intercept))
}
