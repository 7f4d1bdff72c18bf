//! Column typing and missing-value detection for raw tabular cells.

use serde::{Deserialize, Serialize};

/// Logical type of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Every value is missing; the column carries no information.
    Empty,
}

/// Cell spellings treated as missing values.
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Whether a raw cell denotes a missing value.
pub fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Parse a raw cell as a finite number.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Infer the kind of a column from its raw cells.
///
/// A column is numeric when every non-missing cell parses as a number.
pub fn infer_column_kind<'a>(cells: impl IntoIterator<Item = &'a str>) -> ColumnKind {
    let mut seen_value = false;
    for cell in cells {
        if is_missing(cell) {
            continue;
        }
        seen_value = true;
        if parse_numeric(cell).is_none() {
            return ColumnKind::Categorical;
        }
    }
    if seen_value {
        ColumnKind::Numeric
    } else {
        ColumnKind::Empty
    }
}

/// Summary of one column, used for logging and lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
    pub null_count: usize,
}
