use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::dataset::{ColumnSelection, DatasetSource, RawRow};
use crate::error::{EtlError, EtlResult};

/// A dataset split stored as a local JSON Lines file, one object per line.
///
/// The whole file is read up front; blank lines are skipped and do not
/// count as rows.
#[derive(Debug, Clone)]
pub struct JsonlDataset {
    path: PathBuf,
    rows: Vec<Map<String, Value>>,
    columns: ColumnSelection,
}

impl JsonlDataset {
    /// Read a JSON Lines file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a line is not a JSON
    /// object.
    pub fn open(path: impl AsRef<Path>, columns: ColumnSelection) -> EtlResult<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path)?;

        let mut rows = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| EtlError::Parse {
                source_name: path.display().to_string(),
                message: format!("line {}: {e}", line_no + 1),
            })?;
            match value {
                Value::Object(row) => rows.push(row),
                _ => {
                    return Err(EtlError::Parse {
                        source_name: path.display().to_string(),
                        message: format!("line {}: expected a JSON object", line_no + 1),
                    });
                }
            }
        }

        log::debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Self {
            path,
            rows,
            columns,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl DatasetSource for JsonlDataset {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn num_rows(&self) -> EtlResult<u64> {
        Ok(self.len() as u64)
    }

    async fn fetch_row(&self, index: u64) -> EtlResult<RawRow> {
        let row = usize::try_from(index)
            .ok()
            .and_then(|i| self.rows.get(i))
            .ok_or_else(|| EtlError::Parse {
                source_name: self.describe(),
                message: format!("row {index} out of range ({} rows)", self.len()),
            })?;
        self.columns.select(index, row)
    }
}
