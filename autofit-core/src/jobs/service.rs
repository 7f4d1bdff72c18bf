//! Fire-and-forget job façade over the orchestrator.

use crate::config::AutoFitConfig;
use crate::config::StoreConfig;
use crate::data::dataset_fingerprint;
use crate::error::AutoMlError;
use crate::jobs::outcome::{NoopOutcomeSink, OutcomeSink, PredictionRecord};
use crate::jobs::state::{JobFailure, JobId, JobRecord, JobState, JobStatusResponse, SubmitResponse};
use crate::jobs::store::{FileJobStore, InMemoryJobStore, JobStore};
use crate::task::TaskType;
use crate::training::{JobOutcome, Orchestrator, ProgressEvent, ProgressSink, shape_outcome};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// A request to train every model for `task_type` on a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub dataset_path: PathBuf,
    pub target_column: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl TrainingRequest {
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        target_column: impl Into<String>,
        task_type: TaskType,
    ) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            target_column: target_column.into(),
            task_type,
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Accepts training jobs, runs them in the background, and answers status
/// queries from the job store.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    orchestrator: Arc<Orchestrator>,
    outcomes: Arc<dyn OutcomeSink>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, orchestrator: Orchestrator) -> Self {
        Self {
            store,
            orchestrator: Arc::new(orchestrator),
            outcomes: Arc::new(NoopOutcomeSink),
        }
    }

    /// Build a service with the store backend named in `config`.
    pub fn from_config(config: &AutoFitConfig) -> Self {
        let retention = config.jobs.retention();
        let store: Arc<dyn JobStore> = match &config.jobs.store {
            StoreConfig::Memory => Arc::new(InMemoryJobStore::new(retention)),
            StoreConfig::File { dir } => Arc::new(FileJobStore::new(dir.clone(), retention)),
        };
        Self::new(store, Orchestrator::new(config.training.clone()))
    }

    pub fn with_outcome_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.outcomes = sink;
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Record a PENDING job and start it in the background.
    pub async fn submit(&self, request: TrainingRequest) -> Result<SubmitResponse, AutoMlError> {
        let id = JobId::new();
        self.store
            .put(JobRecord::pending(id, request.task_type))
            .await?;
        tracing::info!(
            job_id = %id,
            dataset = %request.dataset_path.display(),
            target_column = %request.target_column,
            task = %request.task_type,
            "Job submitted"
        );

        let service = self.clone();
        tokio::spawn(async move {
            service.execute(id, request).await;
        });
        Ok(SubmitResponse::started(id))
    }

    /// Current state of a job. Reads never change state.
    pub async fn status(&self, id: &JobId) -> Result<JobStatusResponse, AutoMlError> {
        self.store
            .get(id)
            .await?
            .map(|record| JobStatusResponse::from(&record))
            .ok_or_else(|| AutoMlError::UnknownJob { id: id.to_string() })
    }

    async fn execute(&self, id: JobId, request: TrainingRequest) {
        let progress = StoreProgress {
            store: self.store.clone(),
            id,
        };
        let result = self
            .orchestrator
            .run(
                &progress,
                &request.dataset_path,
                &request.target_column,
                request.task_type,
            )
            .await
            .and_then(shape_outcome);

        let state = match result {
            Ok(payload) => {
                tracing::info!(
                    job_id = %id,
                    best_model = %payload.best_model.model_name,
                    score = payload.best_model.best_score,
                    "Job succeeded"
                );
                self.record_outcome(&request, &payload).await;
                JobState::Success(Box::new(payload))
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Job failed");
                JobState::Failure(JobFailure::from(&e))
            }
        };
        if let Err(e) = transition(self.store.as_ref(), id, state).await {
            tracing::error!(job_id = %id, error = %e, "Failed to store final job state");
        }
    }

    async fn record_outcome(&self, request: &TrainingRequest, payload: &JobOutcome) {
        let path = request.dataset_path.clone();
        let hash = tokio::task::spawn_blocking(move || dataset_fingerprint(&path))
            .await
            .map_err(|e| AutoMlError::store(e.to_string()))
            .and_then(|r| r);
        let dataset_hash = match hash {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(error = %e, "Could not fingerprint dataset");
                return;
            }
        };
        let record = PredictionRecord {
            user_id: request.user_id.clone(),
            task_type: request.task_type,
            best_model_name: payload.best_model.model_name.clone(),
            target: request.target_column.clone(),
            metric: payload.best_model.best_score,
            dataset_hash,
            created_at: Utc::now(),
        };
        if let Err(e) = self.outcomes.record(record).await {
            tracing::warn!(error = %e, "Outcome sink rejected prediction record");
        }
    }
}

impl std::fmt::Debug for JobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobService")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

/// Move a job to `next` if its current state allows it.
///
/// Returns whether the record was written.
async fn transition(store: &dyn JobStore, id: JobId, next: JobState) -> Result<bool, AutoMlError> {
    let Some(record) = store.get(&id).await? else {
        tracing::warn!(job_id = %id, "Job vanished before state update");
        return Ok(false);
    };
    if !record.state.accepts(&next) {
        tracing::debug!(
            job_id = %id,
            from = record.state.name(),
            to = next.name(),
            "Ignoring state update"
        );
        return Ok(false);
    }
    store.put(record.with_state(next)).await?;
    Ok(true)
}

/// Writes progress events into the job's record.
struct StoreProgress {
    store: Arc<dyn JobStore>,
    id: JobId,
}

#[async_trait::async_trait]
impl ProgressSink for StoreProgress {
    async fn on_progress(&self, event: &ProgressEvent) {
        let next = JobState::Progress(event.clone());
        if let Err(e) = transition(self.store.as_ref(), self.id, next).await {
            tracing::warn!(job_id = %self.id, error = %e, "Failed to store progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store() -> Arc<InMemoryJobStore> {
        Arc::new(InMemoryJobStore::new(Duration::from_secs(3600)))
    }

    #[tokio::test]
    async fn test_transition_never_rewinds() {
        let store = store();
        let id = JobId::new();
        store.put(JobRecord::pending(id, TaskType::Regression)).await.unwrap();
        let p = |i| JobState::Progress(ProgressEvent::training(i, 3, "m"));
        assert!(transition(store.as_ref(), id, p(2)).await.unwrap());
        assert!(!transition(store.as_ref(), id, p(1)).await.unwrap());
        let failed = JobState::Failure(JobFailure {
            error_kind: "E".into(),
            message: "m".into(),
        });
        assert!(transition(store.as_ref(), id, failed.clone()).await.unwrap());
        assert!(!transition(store.as_ref(), id, p(3)).await.unwrap());
        assert_eq!(store.get(&id).await.unwrap().unwrap().state, failed);
    }

    #[tokio::test]
    async fn test_final_state_lands_after_long_run() {
        let store = Arc::new(InMemoryJobStore::new(Duration::from_secs(1)));
        let id = JobId::new();
        let mut record = JobRecord::pending(id, TaskType::Regression)
            .with_state(JobState::Progress(ProgressEvent::training(6, 6, "m")));
        // Last progress write was ten minutes ago; models are still training.
        record.updated_at = Utc::now() - chrono::Duration::seconds(600);
        store.put(record).await.unwrap();

        let failed = JobState::Failure(JobFailure {
            error_kind: "NoSuccessfulModelsError".into(),
            message: "All 6 models failed to train".into(),
        });
        assert!(transition(store.as_ref(), id, failed.clone()).await.unwrap());

        let service = JobService::new(store, Orchestrator::new(Default::default()));
        assert_eq!(service.status(&id).await.unwrap().state, failed);
    }

    #[tokio::test]
    async fn test_status_unknown_job() {
        let service = JobService::new(store(), Orchestrator::new(Default::default()));
        assert!(matches!(
            service.status(&JobId::new()).await,
            Err(AutoMlError::UnknownJob { .. })
        ));
    }

    #[test]
    fn test_from_config_picks_file_store() {
        let mut config = AutoFitConfig::default();
        config.jobs.store = StoreConfig::File {
            dir: PathBuf::from("/tmp/autofit-jobs"),
        };
        let service = JobService::from_config(&config);
        assert!(format!("{service:?}").starts_with("JobService"));
    }
}
