//! Deterministic train/test partitioning.

use crate::data::frame::{Column, Dataset};
use crate::error::AutoMlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// The four read-only views every trainer shares.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Dataset,
    pub x_test: Dataset,
    pub y_train: Column,
    pub y_test: Column,
}

impl Split {
    pub fn n_train(&self) -> usize {
        self.x_train.n_rows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.n_rows()
    }
}

fn invalid_target(dataset: &Dataset, target: &str) -> AutoMlError {
    AutoMlError::InvalidTarget {
        column: target.to_string(),
        available: dataset.column_names(),
    }
}

/// Rows whose target value is missing cannot be trained or scored on.
///
/// Returns the filtered dataset and the number of dropped rows.
pub fn drop_missing_target(
    dataset: &Dataset,
    target: &str,
) -> Result<(Dataset, usize), AutoMlError> {
    let column = dataset
        .column(target)
        .ok_or_else(|| invalid_target(dataset, target))?;
    let keep: Vec<usize> = (0..dataset.n_rows())
        .filter(|&row| !column.data.is_missing(row))
        .collect();
    let dropped = dataset.n_rows() - keep.len();
    if dropped == 0 {
        return Ok((dataset.clone(), 0));
    }
    Ok((dataset.take(&keep), dropped))
}

/// Shuffle rows with a seeded RNG and hold out `ceil(test_size * n)` of them.
///
/// The same dataset, target and seed always yield the same partition. The
/// input dataset is never modified.
pub fn train_test_split(
    dataset: &Dataset,
    target: &str,
    test_size: f64,
    seed: u64,
) -> Result<Split, AutoMlError> {
    let (features, labels) = dataset
        .split_off(target)
        .ok_or_else(|| invalid_target(dataset, target))?;

    let n = dataset.n_rows();
    let n_test = ((n as f64) * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(AutoMlError::dataset_load(
            "<memory>",
            format!("cannot split {n} rows with test_size {test_size}"),
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let (test_idx, train_idx) = order.split_at(n_test);

    Ok(Split {
        x_train: features.take(train_idx),
        x_test: features.take(test_idx),
        y_train: labels.take(train_idx),
        y_test: labels.take(test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> Dataset {
        Dataset::new(vec![
            Column::numeric("col1", vec![Some(1.0), Some(3.0), Some(5.0), Some(7.0)]),
            Column::numeric("col2", vec![Some(2.0), Some(4.0), Some(6.0), Some(8.0)]),
            Column::numeric("target", vec![Some(0.0), Some(1.0), Some(0.0), Some(1.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_sizes_four_rows() {
        let split = train_test_split(&toy(), "target", 0.2, 42).unwrap();
        assert_eq!(split.n_train(), 3);
        assert_eq!(split.n_test(), 1);
        assert_eq!(split.y_train.len(), 3);
        assert_eq!(split.x_train.column_names(), vec!["col1", "col2"]);
    }

    #[test]
    fn test_split_is_deterministic() {
        let a = train_test_split(&toy(), "target", 0.2, 42).unwrap();
        let b = train_test_split(&toy(), "target", 0.2, 42).unwrap();
        assert_eq!(a.x_train, b.x_train);
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
        assert_eq!(a.y_test, b.y_test);
    }

    #[test]
    fn test_split_partitions_all_rows() {
        let split = train_test_split(&toy(), "target", 0.2, 7).unwrap();
        let mut seen: Vec<f64> = split
            .x_train
            .column("col1")
            .unwrap()
            .as_numeric()
            .unwrap()
            .iter()
            .chain(split.x_test.column("col1").unwrap().as_numeric().unwrap())
            .map(|v| v.unwrap())
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, vec![1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_invalid_target() {
        let err = train_test_split(&toy(), "nonexistent", 0.2, 42).unwrap_err();
        assert!(matches!(err, AutoMlError::InvalidTarget { ref column, .. } if column == "nonexistent"));
    }

    #[test]
    fn test_single_row_cannot_split() {
        let ds = toy().take(&[0]);
        assert!(train_test_split(&ds, "target", 0.2, 42).is_err());
    }

    #[test]
    fn test_drop_missing_target() {
        let ds = Dataset::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::categorical("y", vec![Some("a".into()), None, Some("b".into())]),
        ])
        .unwrap();
        let (filtered, dropped) = drop_missing_target(&ds, "y").unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(filtered.n_rows(), 2);
        assert_eq!(ds.n_rows(), 3);
    }
}
