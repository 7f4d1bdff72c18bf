//! Leakage-safe preprocessing: mean-impute + standard-scale numeric columns,
//! mode-impute + one-hot encode categorical columns.

pub mod fitted;
pub mod plan;

pub use fitted::{FittedPreprocessor, FittedStep};
pub use plan::{ColumnGroup, ImputeStrategy, PreprocessingPlan, Step, UnknownCategory};
