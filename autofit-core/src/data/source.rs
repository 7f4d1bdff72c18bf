//! Dataset sources. Training jobs read a headered CSV file once per run.

use crate::data::frame::{Column, Dataset};
use crate::data::schema::{ColumnKind, infer_column_kind, is_missing, parse_numeric};
use crate::error::AutoMlError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Information about a loaded source, for lineage and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
}

/// Something a dataset can be loaded from.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Load the full dataset.
    async fn load(&self) -> Result<Dataset, AutoMlError>;

    /// Metadata about this source.
    fn source_info(&self) -> DataSourceInfo;
}

/// CSV file data source.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }
}

#[async_trait]
impl DatasetSource for CsvSource {
    async fn load(&self) -> Result<Dataset, AutoMlError> {
        let path = self.path.clone();
        let delimiter = self.delimiter;
        // csv is a blocking reader
        tokio::task::spawn_blocking(move || read_csv(&path, delimiter))
            .await
            .map_err(|e| AutoMlError::dataset_load(&self.path, format!("loader task failed: {e}")))?
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

/// Read a headered CSV file, inferring each column's kind.
pub fn read_csv(path: &Path, delimiter: u8) -> Result<Dataset, AutoMlError> {
    let load_err = |message: String| AutoMlError::dataset_load(path, message);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| load_err(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| load_err(e.to_string()))?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(load_err("missing header row".into()));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| load_err(format!("row {}: {e}", line + 1)))?;
        for (col, value) in record.iter().enumerate() {
            cells[col].push(value.to_string());
        }
    }
    if cells.first().is_none_or(|c| c.is_empty()) {
        return Err(load_err("no data rows".into()));
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| build_column(name, &raw))
        .collect();

    Dataset::new(columns).map_err(|e| load_err(e.to_string()))
}

fn build_column(name: String, raw: &[String]) -> Column {
    match infer_column_kind(raw.iter().map(String::as_str)) {
        ColumnKind::Numeric => Column::numeric(
            name,
            raw.iter()
                .map(|c| if is_missing(c) { None } else { parse_numeric(c) })
                .collect(),
        ),
        ColumnKind::Categorical | ColumnKind::Empty => Column::categorical(
            name,
            raw.iter()
                .map(|c| (!is_missing(c)).then(|| c.clone()))
                .collect(),
        ),
    }
}

/// SHA-256 hex digest of a dataset file, used to identify it in audit records.
pub fn dataset_fingerprint(path: &Path) -> Result<String, AutoMlError> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::ColumnData;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_csv_infers_kinds() {
        let file = write_csv("age,sex,fare\n22,male,7.25\n,female,71.28\n35,,8.05\n");
        let ds = read_csv(file.path(), b',').unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column("age").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("sex").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(
            ds.column("age").unwrap().data,
            ColumnData::Numeric(vec![Some(22.0), None, Some(35.0)])
        );
        assert_eq!(ds.column("sex").unwrap().null_count(), 1);
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let file = write_csv("a,b\n1,2\n3\n");
        let err = read_csv(file.path(), b',').unwrap_err();
        assert!(matches!(err, AutoMlError::DatasetLoad { .. }));
    }

    #[test]
    fn test_read_csv_rejects_header_only() {
        let file = write_csv("a,b\n");
        assert!(read_csv(file.path(), b',').is_err());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = read_csv(Path::new("/nonexistent/data.csv"), b',').unwrap_err();
        assert!(matches!(err, AutoMlError::DatasetLoad { .. }));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let file = write_csv("a\n1\n");
        let first = dataset_fingerprint(file.path()).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, dataset_fingerprint(file.path()).unwrap());
    }

    #[tokio::test]
    async fn test_csv_source_load() {
        let file = write_csv("x,y\n1,2\n3,4\n");
        let source = CsvSource::new(file.path());
        let ds = source.load().await.unwrap();
        assert_eq!(ds.column_names(), vec!["x", "y"]);
        assert_eq!(source.source_info().source_type, "csv");
    }
}
