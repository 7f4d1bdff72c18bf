//! Tabular data: loading, typing, and train/test splitting.

pub mod frame;
pub mod schema;
pub mod source;
pub mod split;

pub use frame::{Column, ColumnData, Dataset, format_number};
pub use schema::{ColumnKind, ColumnSchema};
pub use source::{CsvSource, DataSourceInfo, DatasetSource, dataset_fingerprint, read_csv};
pub use split::{Split, drop_missing_target, train_test_split};
