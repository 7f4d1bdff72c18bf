//! Job identifiers, states and the records kept in a job store.

use crate::error::AutoMlError;
use crate::task::TaskType;
use crate::training::{JobOutcome, ProgressEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = AutoMlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| AutoMlError::UnknownJob { id: s.to_string() })
    }
}

/// Terminal failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub error_kind: String,
    pub message: String,
}

impl From<&AutoMlError> for JobFailure {
    fn from(err: &AutoMlError) -> Self {
        Self {
            error_kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Job state machine: `PENDING → PROGRESS* → SUCCESS | FAILURE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "info", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Progress(ProgressEvent),
    Success(Box<JobOutcome>),
    Failure(JobFailure),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failure(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Progress(_) => "PROGRESS",
            Self::Success(_) => "SUCCESS",
            Self::Failure(_) => "FAILURE",
        }
    }

    /// Whether moving to `next` is allowed: terminal states are final and
    /// progress never goes backwards.
    pub fn accepts(&self, next: &JobState) -> bool {
        match (self, next) {
            (s, _) if s.is_terminal() => false,
            (Self::Progress(cur), Self::Progress(new)) => new.current > cur.current,
            (_, Self::Pending) => false,
            _ => true,
        }
    }
}

/// A stored job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub task_type: TaskType,
    #[serde(flatten)]
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn pending(id: JobId, task_type: TaskType) -> Self {
        let now = Utc::now();
        Self {
            id,
            task_type,
            state: JobState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// A copy in `state`, stamped now.
    pub fn with_state(&self, state: JobState) -> Self {
        Self {
            state,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Reply to a submission: `{task_id, status: "started"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: JobId,
    pub status: String,
}

impl SubmitResponse {
    pub fn started(task_id: JobId) -> Self {
        Self {
            task_id,
            status: "started".into(),
        }
    }
}

/// Reply to a status query: `{task_id, state, info}`.
///
/// `task_id` echoes the queried id so replies can be logged or piped
/// without the request at hand; `state` and `info` are the job state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub task_id: JobId,
    #[serde(flatten)]
    pub state: JobState,
}

impl JobStatusResponse {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl From<&JobRecord> for JobStatusResponse {
    fn from(record: &JobRecord) -> Self {
        Self {
            task_id: record.id,
            state: record.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_progress_wire_shape() {
        let state = JobState::Progress(ProgressEvent::training(2, 6, "Ridge"));
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({
                "state": "PROGRESS",
                "info": {"current": 2, "total": 6, "model": "Ridge", "step": "training"}
            })
        );
    }

    #[test]
    fn test_status_reply_wire_shape() {
        let id: JobId = "6f1c1a52-3f0e-4a0e-9a57-0d1f6c1d2b11".parse().unwrap();
        let reply = JobStatusResponse {
            task_id: id,
            state: JobState::Failure(JobFailure {
                error_kind: "InvalidTargetError".into(),
                message: "Target column 'y' not found".into(),
            }),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "task_id": "6f1c1a52-3f0e-4a0e-9a57-0d1f6c1d2b11",
                "state": "FAILURE",
                "info": {
                    "error_kind": "InvalidTargetError",
                    "message": "Target column 'y' not found"
                }
            })
        );
        let back: JobStatusResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn test_pending_has_no_info() {
        let json = serde_json::to_value(JobState::Pending).unwrap();
        assert_eq!(json, serde_json::json!({"state": "PENDING"}));
    }

    #[test]
    fn test_transitions() {
        let p1 = JobState::Progress(ProgressEvent::training(1, 2, "a"));
        let p2 = JobState::Progress(ProgressEvent::training(2, 2, "b"));
        let failed = JobState::Failure(JobFailure {
            error_kind: "X".into(),
            message: "y".into(),
        });
        assert!(JobState::Pending.accepts(&p1));
        assert!(p1.accepts(&p2));
        assert!(!p2.accepts(&p1));
        assert!(p2.accepts(&failed));
        assert!(!failed.accepts(&p2));
        assert!(!p1.accepts(&JobState::Pending));
    }

    #[test]
    fn test_record_roundtrip() {
        let record = JobRecord::pending(JobId::new(), TaskType::Regression)
            .with_state(JobState::Progress(ProgressEvent::training(1, 6, "LinearRegression")));
        let json = serde_json::to_string(&record).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
        assert!(matches!(
            "not-a-job".parse::<JobId>(),
            Err(AutoMlError::UnknownJob { .. })
        ));
    }
}
