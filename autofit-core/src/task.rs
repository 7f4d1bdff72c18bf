//! Task types and the scoring conventions attached to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of supervised learning problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Regression,
    Classification,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Regression => write!(f, "regression"),
            TaskType::Classification => write!(f, "classification"),
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "regression" => Ok(TaskType::Regression),
            "classification" => Ok(TaskType::Classification),
            other => Err(format!("Unknown task type: {other}")),
        }
    }
}

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// Scoring metric used to rank models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MeanAbsoluteError,
    F1,
}

impl Metric {
    pub fn direction(self) -> Direction {
        match self {
            Metric::MeanAbsoluteError => Direction::LowerIsBetter,
            Metric::F1 => Direction::HigherIsBetter,
        }
    }

    /// Convert a native score to the always-maximized search score.
    pub fn to_search_score(self, native: f64) -> f64 {
        match self.direction() {
            Direction::LowerIsBetter => -native,
            Direction::HigherIsBetter => native,
        }
    }

    /// Inverse of [`Metric::to_search_score`].
    pub fn from_search_score(self, search: f64) -> f64 {
        match self.direction() {
            Direction::LowerIsBetter => -search,
            Direction::HigherIsBetter => search,
        }
    }

    /// Whether native score `a` beats native score `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self.direction() {
            Direction::LowerIsBetter => a < b,
            Direction::HigherIsBetter => a > b,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::MeanAbsoluteError => "mean_absolute_error",
            Metric::F1 => "f1",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TaskType {
    /// Metric every model of this task type is scored with.
    pub fn metric(self) -> Metric {
        match self {
            TaskType::Regression => Metric::MeanAbsoluteError,
            TaskType::Classification => Metric::F1,
        }
    }
}
