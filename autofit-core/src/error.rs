//! Error types for the autofit-core crate.
//!
//! Validation failures (`DatasetLoad`, `InvalidTarget`) abort a job before any
//! model is trained. `ModelTrainingError` is the per-worker error: the
//! orchestrator collects it next to successful results instead of aborting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = AutoMlError> = std::result::Result<T, E>;

/// Top-level error type for AutoML operations.
#[derive(Debug, Error)]
pub enum AutoMlError {
    #[error("Failed to load dataset {}: {message}", path.display())]
    DatasetLoad { path: PathBuf, message: String },

    #[error("Invalid target column '{column}' (available: {})", available.join(", "))]
    InvalidTarget {
        column: String,
        available: Vec<String>,
    },

    #[error("Target column '{column}' cannot be used: {reason}")]
    UnusableTarget { column: String, reason: String },

    #[error(transparent)]
    ModelTraining(#[from] ModelTrainingError),

    #[error("All {} models failed to train", failures.len())]
    NoSuccessfulModels { failures: Vec<ModelTrainingError> },

    #[error("Unknown job: {id}")]
    UnknownJob { id: String },

    #[error("Timed out after {waited_secs}s waiting for job {id}")]
    PollTimeout { id: String, waited_secs: u64 },

    #[error("Job store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AutoMlError {
    pub fn dataset_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DatasetLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Stable name of the error variant, reported in job failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DatasetLoad { .. } => "DatasetLoadError",
            Self::InvalidTarget { .. } => "InvalidTargetError",
            Self::UnusableTarget { .. } => "UnusableTargetError",
            Self::ModelTraining(_) => "ModelTrainingError",
            Self::NoSuccessfulModels { .. } => "NoSuccessfulModelsError",
            Self::UnknownJob { .. } => "UnknownJobError",
            Self::PollTimeout { .. } => "PollTimeoutError",
            Self::Store { .. } => "StoreError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Serde(_) => "SerializationError",
        }
    }

    /// Whether this error was raised while validating the job's inputs.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DatasetLoad { .. } | Self::InvalidTarget { .. } | Self::UnusableTarget { .. }
        )
    }
}

/// A single model family failed to fit or predict.
///
/// Serializable so it can be carried inside a job's success payload when
/// sibling models completed.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("Model '{model_name}' failed: {error}")]
pub struct ModelTrainingError {
    pub model_name: String,
    pub error: String,
}

impl ModelTrainingError {
    pub fn new(model_name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            model_name: model_name.into(),
            error: error.to_string(),
        }
    }
}

/// Errors raised by estimators and the preprocessing pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Estimator used before fit")]
    NotFitted,

    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Length mismatch: {rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("Unknown hyperparameter '{name}'")]
    UnknownParam { name: String },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("Linear system is singular")]
    Singular,

    #[error("Non-finite value encountered during {stage}")]
    NonFinite { stage: String },

    #[error("Preprocessing failed: {0}")]
    Preprocess(String),
}

impl ModelError {
    pub fn invalid_param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
