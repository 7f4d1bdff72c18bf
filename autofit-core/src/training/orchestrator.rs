//! Training orchestrator: split and preprocess once, then fan out one trainer
//! per model family across a bounded worker pool.

use crate::config::TrainingConfig;
use crate::data::{CsvSource, Dataset, DatasetSource, drop_missing_target, train_test_split};
use crate::error::{AutoMlError, ModelTrainingError};
use crate::preprocess::PreprocessingPlan;
use crate::registry::specs_for;
use crate::task::TaskType;
use crate::training::progress::{ProgressEvent, ProgressSink};
use crate::training::target::encode_target;
use crate::training::trainer::{self, TrainingData, TrainingResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{self, AbortHandle, JoinSet};

/// Results of one run, in completion order.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub results: Vec<TrainingResult>,
    pub failures: Vec<ModelTrainingError>,
}

/// Drives a whole training run for one job.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: TrainingConfig,
}

impl Orchestrator {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Load a CSV dataset and run every model for `task` on it.
    pub async fn run(
        &self,
        progress: &dyn ProgressSink,
        dataset_path: &Path,
        target: &str,
        task: TaskType,
    ) -> Result<RunOutcome, AutoMlError> {
        self.run_source(progress, &CsvSource::new(dataset_path), target, task)
            .await
    }

    /// Same as [`Orchestrator::run`], for any dataset source.
    pub async fn run_source(
        &self,
        progress: &dyn ProgressSink,
        source: &dyn DatasetSource,
        target: &str,
        task: TaskType,
    ) -> Result<RunOutcome, AutoMlError> {
        let dataset = source.load().await?;
        self.run_dataset(progress, &dataset, target, task).await
    }

    /// Run every model for `task` on an in-memory dataset.
    pub async fn run_dataset(
        &self,
        progress: &dyn ProgressSink,
        dataset: &Dataset,
        target: &str,
        task: TaskType,
    ) -> Result<RunOutcome, AutoMlError> {
        let start = Instant::now();
        let data = Arc::new(prepare(dataset, target, task, &self.config)?);
        let specs = specs_for(task);
        let total = specs.len();
        let workers = self.config.worker_count(total);

        tracing::info!(
            rows = dataset.n_rows(),
            columns = dataset.n_cols(),
            train_rows = data.split.n_train(),
            test_rows = data.split.n_test(),
            task = %task,
            models = total,
            workers,
            "Starting training run"
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();

        for (i, spec) in specs.into_iter().enumerate() {
            progress
                .on_progress(&ProgressEvent::training(i + 1, total, spec.name))
                .await;

            let name = spec.name;
            let data = data.clone();
            let config = self.config.clone();
            let handle = spawn_worker(&mut tasks, semaphore.clone(), name, move || {
                trainer::train(&spec, &data, &config)
            });
            names.insert(handle.id(), name);
        }

        let outcome = collect(tasks, &names).await;

        tracing::info!(
            succeeded = outcome.results.len(),
            failed = outcome.failures.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training run complete"
        );
        Ok(outcome)
    }
}

type WorkerResult = Result<TrainingResult, ModelTrainingError>;

/// Queue one model on the pool. The blocking work runs once a permit is free.
fn spawn_worker<F>(
    tasks: &mut JoinSet<WorkerResult>,
    semaphore: Arc<Semaphore>,
    name: &'static str,
    work: F,
) -> AbortHandle
where
    F: FnOnce() -> WorkerResult + Send + 'static,
{
    tasks.spawn(async move {
        let _permit = semaphore
            .acquire_owned()
            .await
            .map_err(|e| ModelTrainingError::new(name, e))?;
        tracing::info!(model = name, "Training model");
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(work)
            .await
            .unwrap_or_else(|e| Err(ModelTrainingError::new(name, format!("worker aborted: {e}"))));
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(r) => tracing::info!(
                model = name,
                score = r.best_score,
                elapsed_ms,
                "Model finished"
            ),
            Err(e) => tracing::warn!(model = name, error = %e.error, elapsed_ms, "Model failed"),
        }
        result
    })
}

/// Drain the pool in completion order. A worker that panicked or was
/// cancelled is reported under the model name it was spawned with.
async fn collect(
    mut tasks: JoinSet<WorkerResult>,
    names: &HashMap<task::Id, &'static str>,
) -> RunOutcome {
    let mut outcome = RunOutcome::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, Ok(result))) => outcome.results.push(result),
            Ok((_, Err(failure))) => outcome.failures.push(failure),
            Err(e) => {
                let name = names.get(&e.id()).copied().unwrap_or("unknown");
                tracing::warn!(model = name, error = %e, "Worker aborted");
                outcome
                    .failures
                    .push(ModelTrainingError::new(name, format!("worker aborted: {e}")));
            }
        }
    }
    outcome
}

/// Validate the target, split, encode labels and build the preprocessing
/// plan from the training features.
pub fn prepare(
    dataset: &Dataset,
    target: &str,
    task: TaskType,
    config: &TrainingConfig,
) -> Result<TrainingData, AutoMlError> {
    let (dataset, dropped) = drop_missing_target(dataset, target)?;
    if dropped > 0 {
        tracing::warn!(target_column = target, dropped, "Dropped rows with a missing target");
    }
    let split = train_test_split(&dataset, target, config.test_size, config.random_seed)?;
    let encoded = encode_target(task, &split.y_train, &split.y_test)?;
    let plan = PreprocessingPlan::build(&split.x_train);
    Ok(TrainingData {
        task,
        split,
        target: encoded,
        plan,
    })
}
