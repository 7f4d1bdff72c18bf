//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use autofit_core::data::{Column, Dataset, train_test_split};
use autofit_core::preprocess::PreprocessingPlan;
use autofit_core::registry::SearchSpace;
use autofit_core::training::{RecordingProgress, TrainingResult, pick_best};
use autofit_core::task::Metric;
use autofit_core::{Orchestrator, TaskType, TrainingConfig};

fn numeric_dataset(n: usize) -> Dataset {
    Dataset::new(vec![
        Column::numeric("x", (0..n).map(|i| Some(i as f64)).collect()),
        Column::numeric("y", (0..n).map(|i| Some(2.0 * i as f64 + 1.0)).collect()),
    ])
    .unwrap()
}

fn result(name: &str, metric: Metric, score: f64) -> TrainingResult {
    TrainingResult {
        model_name: name.to_string(),
        metric,
        best_score: score,
        predictions: vec![],
        params: None,
        classes: None,
    }
}

// --- Split properties ---

proptest! {
    #[test]
    fn split_is_deterministic_and_partitions(
        n in 2usize..200,
        test_size in 0.05f64..0.5,
        seed in any::<u64>(),
    ) {
        let ds = numeric_dataset(n);
        let a = train_test_split(&ds, "y", test_size, seed).unwrap();
        let b = train_test_split(&ds, "y", test_size, seed).unwrap();
        prop_assert_eq!(&a.x_test, &b.x_test);
        prop_assert_eq!(&a.y_train, &b.y_train);

        let expected_test = ((n as f64) * test_size).ceil() as usize;
        prop_assert_eq!(a.n_test(), expected_test);
        prop_assert_eq!(a.n_train() + a.n_test(), n);

        // Every row lands on exactly one side.
        let mut seen: Vec<f64> = a.x_train.column("x").unwrap().as_numeric().unwrap()
            .iter()
            .chain(a.x_test.column("x").unwrap().as_numeric().unwrap())
            .map(|v| v.unwrap())
            .collect();
        seen.sort_by(f64::total_cmp);
        let all: Vec<f64> = (0..n).map(|i| i as f64).collect();
        prop_assert_eq!(seen, all);
    }
}

// --- Selector properties ---

proptest! {
    #[test]
    fn regression_selection_picks_minimum(
        scores in proptest::collection::vec(0.0f64..1e6, 1..10),
    ) {
        let results: Vec<_> = scores.iter().enumerate()
            .map(|(i, &s)| result(&format!("m{i}"), TaskType::Regression.metric(), s))
            .collect();
        let best = pick_best(&results).unwrap();
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        prop_assert_eq!(best.best_score, min);
        // Ties keep the earliest result.
        let first = scores.iter().position(|&s| s == min).unwrap();
        prop_assert_eq!(&best.model_name, &format!("m{first}"));
    }

    #[test]
    fn classification_selection_picks_maximum(
        scores in proptest::collection::vec(0.0f64..=1.0, 1..10),
    ) {
        let results: Vec<_> = scores.iter().enumerate()
            .map(|(i, &s)| result(&format!("m{i}"), TaskType::Classification.metric(), s))
            .collect();
        let best = pick_best(&results).unwrap();
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(best.best_score, max);
    }
}

// --- Preprocessing properties ---

proptest! {
    #[test]
    fn unseen_category_encodes_to_zeros(
        seen in proptest::collection::vec("[a-c]", 1..20),
        unseen in "[x-z]{2}",
    ) {
        let n = seen.len();
        let train = Dataset::new(vec![
            Column::numeric("num", (0..n).map(|i| Some(i as f64)).collect()),
            Column::categorical("cat", seen.iter().cloned().map(Some).collect()),
        ]).unwrap();
        let plan = PreprocessingPlan::build(&train);
        let fitted = plan.fit(&train).unwrap();

        let test = Dataset::new(vec![
            Column::numeric("num", vec![Some(0.0)]),
            Column::categorical("cat", vec![Some(unseen)]),
        ]).unwrap();
        let x = fitted.transform(&test).unwrap();
        prop_assert_eq!(x.ncols(), fitted.n_features());
        // First column is the scaled numeric feature; the rest are one-hot.
        prop_assert!(x.row(0).iter().skip(1).all(|&v| v == 0.0));
    }

    #[test]
    fn full_grid_configs_are_distinct(a in 1usize..5, b in 1usize..5) {
        let space = SearchSpace::empty()
            .with("p", (0..a as i64).map(Into::into).collect())
            .with("q", (0..b as i64).map(Into::into).collect());
        prop_assert_eq!(space.size(), a * b);
        let mut configs: Vec<String> = (0..space.size())
            .map(|i| format!("{:?}", space.config_at(i)))
            .collect();
        configs.sort();
        configs.dedup();
        prop_assert_eq!(configs.len(), a * b);
    }
}

// --- Orchestrator progress properties ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn progress_counts_up_to_total(seed in any::<u64>()) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let config = TrainingConfig {
            random_seed: seed,
            search_iterations: 1,
            ..TrainingConfig::default()
        };
        let progress = RecordingProgress::new();
        let events = rt.block_on(async {
            Orchestrator::new(config)
                .run_dataset(&progress, &numeric_dataset(12), "y", TaskType::Regression)
                .await
                .unwrap();
            progress.events().await
        });
        prop_assert_eq!(events.len(), 6);
        for (i, event) in events.iter().enumerate() {
            prop_assert_eq!(event.current, i + 1);
            prop_assert_eq!(event.total, 6);
        }
    }
}
