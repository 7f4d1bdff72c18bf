//! Configuration types for autofit.
//!
//! Every field has a default, so an empty config file (or none at all)
//! reproduces the stock training behavior: 80/20 split, seed 42, 3-fold CV,
//! 4 sampled configurations per searched model.

use crate::error::AutoMlError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level autofit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoFitConfig {
    /// Training run configuration.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Job lifecycle configuration.
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Caller-side polling policy.
    #[serde(default)]
    pub poll: PollConfig,
}

/// Training run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for testing.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Seed shared by the split, the search sampler, subsampling and ensembles.
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    /// Number of cross-validation folds used by the randomized search.
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Number of configurations sampled per searched model.
    #[serde(default = "default_search_iterations")]
    pub search_iterations: usize,
    /// Training rows above which boosted models train on a subsample.
    #[serde(default = "default_subsample_threshold")]
    pub subsample_threshold: usize,
    /// Number of test-set predictions reported per model.
    #[serde(default = "default_prediction_sample")]
    pub prediction_sample_size: usize,
    /// Worker pool size (0 = available parallelism - 1).
    #[serde(default)]
    pub max_workers: usize,
    /// Threads an ensemble model may use internally while fanned out.
    #[serde(default = "default_model_threads")]
    pub model_threads: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            random_seed: default_seed(),
            cv_folds: default_cv_folds(),
            search_iterations: default_search_iterations(),
            subsample_threshold: default_subsample_threshold(),
            prediction_sample_size: default_prediction_sample(),
            max_workers: 0,
            model_threads: default_model_threads(),
        }
    }
}

impl TrainingConfig {
    /// Resolve the worker pool size for `n_models` submissions.
    ///
    /// `min(n_models, max(1, parallelism - 1))`, or the configured override
    /// capped the same way.
    pub fn worker_count(&self, n_models: usize) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let wanted = if self.max_workers > 0 {
            self.max_workers
        } else {
            available.saturating_sub(1).max(1)
        };
        wanted.min(n_models).max(1)
    }
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_cv_folds() -> usize {
    3
}

fn default_search_iterations() -> usize {
    4
}

fn default_subsample_threshold() -> usize {
    50_000
}

fn default_prediction_sample() -> usize {
    5
}

fn default_model_threads() -> usize {
    1
}

/// Job lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Seconds a finished job record is retained after completion.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Job store backend.
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            store: StoreConfig::default(),
        }
    }
}

impl JobsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

fn default_retention_secs() -> u64 {
    3600
}

/// Job store backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    File {
        dir: PathBuf,
    },
}

/// Polling policy for callers waiting on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_factor: default_backoff_factor(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

fn default_initial_interval_ms() -> u64 {
    500
}

fn default_max_interval_ms() -> u64 {
    5_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_wait_secs() -> u64 {
    3_600
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `AUTOFIT_`)
/// 3. Workspace-local config (`.autofit/config.toml`)
/// 4. User config (`~/.config/autofit/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AutoFitConfig>,
) -> Result<AutoFitConfig, AutoMlError> {
    let mut figment = Figment::from(Serialized::defaults(AutoFitConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "autofit", "autofit") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".autofit").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // AUTOFIT_TRAINING__CV_FOLDS, AUTOFIT_JOBS__RETENTION_SECS, ...
    figment = figment.merge(Env::prefixed("AUTOFIT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| AutoMlError::Config(Box::new(e)))
}
