//! Scoring functions.

use crate::task::Metric;
use std::collections::BTreeSet;

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// F1 over class indices.
///
/// With two classes this is the F1 of class `1`. With more it is the
/// unweighted mean over every class present in either input. A class with no
/// predicted and no true members scores 0.
pub fn f1_score(y_true: &[f64], y_pred: &[f64], n_classes: usize) -> f64 {
    if n_classes <= 2 {
        return class_f1(y_true, y_pred, 1.0);
    }
    let present: BTreeSet<i64> = y_true
        .iter()
        .chain(y_pred)
        .map(|&c| c.round() as i64)
        .collect();
    if present.is_empty() {
        return 0.0;
    }
    present
        .iter()
        .map(|&c| class_f1(y_true, y_pred, c as f64))
        .sum::<f64>()
        / present.len() as f64
}

fn class_f1(y_true: &[f64], y_pred: &[f64], class: f64) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0.0, 0.0, 0.0);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == class, p == class) {
            (true, true) => tp += 1.0,
            (false, true) => fp += 1.0,
            (true, false) => fn_ += 1.0,
            (false, false) => {}
        }
    }
    let denom = 2.0 * tp + fp + fn_;
    if denom == 0.0 { 0.0 } else { 2.0 * tp / denom }
}

/// Native score of `metric`.
pub fn score(metric: Metric, y_true: &[f64], y_pred: &[f64], n_classes: usize) -> f64 {
    match metric {
        Metric::MeanAbsoluteError => mean_absolute_error(y_true, y_pred),
        Metric::F1 => f1_score(y_true, y_pred, n_classes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mae() {
        assert_eq!(mean_absolute_error(&[1.0, 2.0], &[2.0, 4.0]), 1.5);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }

    #[test]
    fn test_binary_f1_on_positive_class() {
        let y_true = [1.0, 1.0, 0.0, 0.0];
        let y_pred = [1.0, 0.0, 1.0, 0.0];
        assert!((f1_score(&y_true, &y_pred, 2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_f1_zero_division() {
        assert_eq!(f1_score(&[0.0, 0.0], &[0.0, 0.0], 2), 0.0);
    }

    #[test]
    fn test_macro_f1() {
        let y_true = [0.0, 1.0, 2.0];
        let y_pred = [0.0, 1.0, 1.0];
        // class 0: 1.0, class 1: 2/3, class 2: 0.0
        let expected = (1.0 + 2.0 / 3.0) / 3.0;
        assert!((f1_score(&y_true, &y_pred, 3) - expected).abs() < 1e-12);
    }
}
