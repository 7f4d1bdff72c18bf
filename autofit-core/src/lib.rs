//! # Autofit Core
//!
//! Asynchronous AutoML training for tabular datasets.
//! Loads a CSV, builds a preprocessing plan, trains every registered model
//! for the task on a bounded worker pool, picks the best one, and exposes the
//! whole run as a pollable background job.

pub mod config;
pub mod data;
pub mod error;
pub mod jobs;
pub mod models;
pub mod preprocess;
pub mod registry;
pub mod task;
pub mod training;

// Re-export commonly used types at the crate root.
pub use config::{AutoFitConfig, JobsConfig, PollConfig, StoreConfig, TrainingConfig, load_config};
pub use data::{CsvSource, Dataset, DatasetSource, Split, train_test_split};
pub use error::{AutoMlError, ModelError, ModelTrainingError, Result};
pub use jobs::{
    FileJobStore, InMemoryJobStore, JobId, JobService, JobState, JobStatusResponse, JobStore,
    OutcomeSink, PollPolicy, SubmitResponse, TrainingRequest, wait_for_completion,
};
pub use preprocess::{FittedPreprocessor, PreprocessingPlan};
pub use registry::{ModelSpec, SearchSpace, specs_for};
pub use task::{Direction, Metric, TaskType};
pub use training::{
    JobOutcome, Orchestrator, ProgressEvent, ProgressSink, RunOutcome, TrainingResult, pick_best,
};
