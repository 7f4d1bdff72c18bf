//! Job stores: the single source of truth for job state.
//!
//! Finished records expire `retention` after the job completed. Expired
//! records read as absent and are purged on access. Pending and running jobs
//! never expire, however long their models take.

use crate::error::AutoMlError;
use crate::jobs::state::{JobId, JobRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;

/// Key-value store of job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace a record.
    async fn put(&self, record: JobRecord) -> Result<(), AutoMlError>;

    /// Fetch a live record.
    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>, AutoMlError>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, id: &JobId) -> Result<bool, AutoMlError>;
}

/// A terminal record is never written again, so its `updated_at` is the
/// completion time.
fn is_expired(record: &JobRecord, retention: Duration) -> bool {
    if !record.state.is_terminal() {
        return false;
    }
    let age = Utc::now().signed_duration_since(record.updated_at);
    age.num_milliseconds() > retention.as_millis() as i64
}

/// In-process store.
#[derive(Debug)]
pub struct InMemoryJobStore {
    records: RwLock<HashMap<JobId, JobRecord>>,
    retention: Duration,
}

impl InMemoryJobStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Drop every expired record. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !is_expired(r, self.retention));
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, record: JobRecord) -> Result<(), AutoMlError> {
        self.records.write().await.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>, AutoMlError> {
        {
            let records = self.records.read().await;
            match records.get(id) {
                None => return Ok(None),
                Some(r) if !is_expired(r, self.retention) => return Ok(Some(r.clone())),
                Some(_) => {}
            }
        }
        tracing::warn!(job_id = %id, "Job record expired");
        self.records.write().await.remove(id);
        Ok(None)
    }

    async fn delete(&self, id: &JobId) -> Result<bool, AutoMlError> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}

/// One JSON file per job under `dir`, written atomically.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
    retention: Duration,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

/// Write JSON to a `.tmp` sibling, then rename over the target.
async fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), AutoMlError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(data)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn put(&self, record: JobRecord) -> Result<(), AutoMlError> {
        atomic_write_json(&self.path_for(&record.id), &record).await
    }

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>, AutoMlError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: JobRecord = serde_json::from_slice(&bytes)
            .map_err(|e| AutoMlError::store(format!("corrupt job file {}: {e}", path.display())))?;
        if is_expired(&record, self.retention) {
            tracing::warn!(job_id = %id, "Job record expired");
            self.delete(id).await?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn delete(&self, id: &JobId) -> Result<bool, AutoMlError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::state::{JobFailure, JobState};
    use crate::task::TaskType;
    use crate::training::ProgressEvent;

    fn record() -> JobRecord {
        JobRecord::pending(JobId::new(), TaskType::Regression)
    }

    /// A FAILURE record that completed `secs` seconds ago.
    fn finished(secs: i64) -> JobRecord {
        let mut rec = record().with_state(JobState::Failure(JobFailure {
            error_kind: "DatasetLoadError".into(),
            message: "gone".into(),
        }));
        rec.updated_at = Utc::now() - chrono::Duration::seconds(secs);
        rec
    }

    /// A PROGRESS record last touched `secs` seconds ago.
    fn running(secs: i64) -> JobRecord {
        let mut rec =
            record().with_state(JobState::Progress(ProgressEvent::training(6, 6, "Ridge")));
        rec.updated_at = Utc::now() - chrono::Duration::seconds(secs);
        rec
    }

    #[tokio::test]
    async fn test_memory_put_get_delete() {
        let store = InMemoryJobStore::new(Duration::from_secs(3600));
        let rec = record();
        store.put(rec.clone()).await.unwrap();
        assert_eq!(store.get(&rec.id).await.unwrap(), Some(rec.clone()));
        assert!(store.delete(&rec.id).await.unwrap());
        assert_eq!(store.get(&rec.id).await.unwrap(), None);
        assert!(!store.delete(&rec.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_expiry() {
        let store = InMemoryJobStore::new(Duration::from_secs(60));
        let rec = finished(120);
        store.put(rec.clone()).await.unwrap();
        assert_eq!(store.get(&rec.id).await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_running_job_outlives_retention() {
        let store = InMemoryJobStore::new(Duration::from_secs(1));
        let pending = {
            let mut rec = record();
            rec.updated_at = Utc::now() - chrono::Duration::seconds(600);
            rec
        };
        let busy = running(600);
        store.put(pending.clone()).await.unwrap();
        store.put(busy.clone()).await.unwrap();
        assert_eq!(store.get(&pending.id).await.unwrap(), Some(pending));
        assert_eq!(store.get(&busy.id).await.unwrap(), Some(busy));
        assert_eq!(store.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_memory_purge() {
        let store = InMemoryJobStore::new(Duration::from_secs(60));
        store.put(finished(120)).await.unwrap();
        store.put(finished(0)).await.unwrap();
        store.put(running(120)).await.unwrap();
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(dir.path().join("jobs"), Duration::from_secs(3600));
        let rec = record().with_state(JobState::Progress(ProgressEvent::training(1, 5, "Ridge")));
        store.put(rec.clone()).await.unwrap();
        assert_eq!(store.get(&rec.id).await.unwrap(), Some(rec.clone()));
        assert!(!dir.path().join("jobs").join(format!("{}.tmp", rec.id)).exists());
        assert!(store.delete(&rec.id).await.unwrap());
        assert_eq!(store.get(&rec.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_expiry_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(dir.path(), Duration::from_secs(1));
        let rec = finished(10);
        store.put(rec.clone()).await.unwrap();
        assert_eq!(store.get(&rec.id).await.unwrap(), None);
        assert!(!dir.path().join(format!("{}.json", rec.id)).exists());
    }

    #[tokio::test]
    async fn test_file_store_keeps_running_job() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(dir.path(), Duration::from_secs(1));
        let rec = running(10);
        store.put(rec.clone()).await.unwrap();
        assert_eq!(store.get(&rec.id).await.unwrap(), Some(rec));
    }
}
