//! Hyperparameter values as they appear in search spaces and reports.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Absent limit, e.g. unbounded `max_depth`.
    None,
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self, name: &str) -> Result<f64, ModelError> {
        match self {
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            _ => Err(ModelError::invalid_param(name, format!("expected a number, got {self}"))),
        }
    }

    pub fn as_usize(&self, name: &str) -> Result<usize, ModelError> {
        match self {
            Self::Int(v) if *v >= 0 => Ok(*v as usize),
            _ => Err(ModelError::invalid_param(
                name,
                format!("expected a non-negative integer, got {self}"),
            )),
        }
    }

    /// Optional limit: `None` and negative integers mean "no limit".
    pub fn as_limit(&self, name: &str) -> Result<Option<usize>, ModelError> {
        match self {
            Self::None => Ok(None),
            Self::Int(v) if *v < 0 => Ok(None),
            other => other.as_usize(name).map(Some),
        }
    }

    /// A fraction in `(0, 1]`.
    pub fn as_fraction(&self, name: &str) -> Result<f64, ModelError> {
        let v = self.as_f64(name)?;
        if v > 0.0 && v <= 1.0 {
            Ok(v)
        } else {
            Err(ModelError::invalid_param(name, format!("{v} is not in (0, 1]")))
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
