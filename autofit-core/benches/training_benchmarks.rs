use autofit_core::data::{Column, Dataset};
use autofit_core::models::{Estimator, ModelFamily};
use autofit_core::preprocess::PreprocessingPlan;
use autofit_core::registry::specs_for;
use autofit_core::TaskType;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn regression_matrix(n: usize, d: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(7);
    let x = Array2::from_shape_fn((n, d), |_| rng.gen_range(-1.0..1.0));
    let y = x
        .rows()
        .into_iter()
        .map(|r| 3.0 * r[0] - 2.0 * r[1 % d] + rng.gen_range(-0.1..0.1))
        .collect();
    (x, y)
}

fn bench_estimators(c: &mut Criterion) {
    let (x, y) = regression_matrix(500, 8);

    for family in [
        ModelFamily::Ridge,
        ModelFamily::DecisionTree,
        ModelFamily::GradientBoosting,
        ModelFamily::HistGradientBoosting,
    ] {
        c.bench_function(&format!("fit_{family:?}_500x8"), |b| {
            b.iter(|| {
                let mut model = family.build(0, 1, 42);
                model.fit(black_box(x.view()), black_box(y.view())).unwrap();
                model
            })
        });
    }

    let mut forest = ModelFamily::RandomForest.build(0, 1, 42);
    forest
        .set_param("n_estimators", &autofit_core::models::ParamValue::Int(20))
        .unwrap();
    c.bench_function("fit_random_forest_20_trees", |b| {
        b.iter(|| forest.fit(black_box(x.view()), black_box(y.view())).unwrap())
    });

    let mut tree = ModelFamily::DecisionTree.build(0, 1, 42);
    tree.fit(x.view(), y.view()).unwrap();
    c.bench_function("predict_decision_tree_500x8", |b| {
        b.iter(|| tree.predict(black_box(x.view())).unwrap())
    });
}

fn bench_preprocessing(c: &mut Criterion) {
    let n = 2000;
    let cities = ["north", "south", "east", "west"];
    let ds = Dataset::new(vec![
        Column::numeric(
            "sqft",
            (0..n)
                .map(|i| if i % 17 == 0 { None } else { Some(i as f64) })
                .collect(),
        ),
        Column::categorical(
            "city",
            (0..n).map(|i| Some(cities[i % 4].to_string())).collect(),
        ),
    ])
    .unwrap();
    let plan = PreprocessingPlan::build(&ds);

    c.bench_function("preprocess_fit_transform_2000_rows", |b| {
        b.iter(|| {
            let fitted = plan.fit(black_box(&ds)).unwrap();
            fitted.transform(&ds).unwrap()
        })
    });
}

fn bench_registry(c: &mut Criterion) {
    c.bench_function("registry_hist_grid_config_at", |b| {
        let specs = specs_for(TaskType::Regression);
        let hist = specs
            .iter()
            .find(|s| s.family == ModelFamily::HistGradientBoosting)
            .unwrap();
        b.iter(|| hist.search_space.config_at(black_box(123_457)))
    });
}

criterion_group!(benches, bench_estimators, bench_preprocessing, bench_registry);
criterion_main!(benches);
