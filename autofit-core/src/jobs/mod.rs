//! Asynchronous job façade: submission, state storage, status and polling.

pub mod outcome;
pub mod poll;
pub mod service;
pub mod state;
pub mod store;

pub use outcome::{NoopOutcomeSink, OutcomeSink, PredictionRecord, RecordingOutcomeSink};
pub use poll::{PollPolicy, wait_for_completion};
pub use service::{JobService, TrainingRequest};
pub use state::{JobFailure, JobId, JobRecord, JobState, JobStatusResponse, SubmitResponse};
pub use store::{FileJobStore, InMemoryJobStore, JobStore};
