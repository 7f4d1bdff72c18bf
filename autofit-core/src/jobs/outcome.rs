//! Records handed to external storage after a job succeeds.

use crate::error::AutoMlError;
use crate::task::TaskType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit record of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub user_id: Option<String>,
    pub task_type: TaskType,
    pub best_model_name: String,
    pub target: String,
    /// Best model's score in its metric's native scale.
    pub metric: f64,
    /// SHA-256 hex digest of the dataset file.
    pub dataset_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Destination of prediction records. Storage itself lives outside this crate.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn record(&self, record: PredictionRecord) -> Result<(), AutoMlError>;
}

/// Drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOutcomeSink;

#[async_trait]
impl OutcomeSink for NoopOutcomeSink {
    async fn record(&self, _record: PredictionRecord) -> Result<(), AutoMlError> {
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct RecordingOutcomeSink {
    records: tokio::sync::Mutex<Vec<PredictionRecord>>,
}

impl RecordingOutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<PredictionRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl OutcomeSink for RecordingOutcomeSink {
    async fn record(&self, record: PredictionRecord) -> Result<(), AutoMlError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}
