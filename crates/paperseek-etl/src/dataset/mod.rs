//! Dataset sources.
//!
//! A source exposes a split as a row count plus random access by row index,
//! which is all fixed-seed sampling needs. Only the title and abstract
//! columns survive column selection.

mod hub;
mod jsonl;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

use crate::config::DatasetConfig;
use crate::error::{EtlError, EtlResult};

pub use hub::HubDataset;
pub use jsonl::JsonlDataset;

/// The two text columns kept from a dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub title: String,
    pub abstract_text: String,
}

/// A read-only tabular dataset split.
#[async_trait]
pub trait DatasetSource: Send + Sync + fmt::Debug {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Number of rows in the split.
    async fn num_rows(&self) -> EtlResult<u64>;

    /// Fetch a single row by index.
    async fn fetch_row(&self, index: u64) -> EtlResult<RawRow>;

    /// Fetch rows by index, in the order given.
    async fn fetch_rows(&self, indices: &[u64]) -> EtlResult<Vec<RawRow>> {
        let mut rows = Vec::with_capacity(indices.len());
        for (n, &index) in indices.iter().enumerate() {
            rows.push(self.fetch_row(index).await?);
            if (n + 1) % 25 == 0 {
                log::info!("Fetched {}/{} rows", n + 1, indices.len());
            }
        }
        Ok(rows)
    }
}

/// Which columns hold the title and the abstract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub title: String,
    pub abstract_text: String,
}

impl ColumnSelection {
    #[must_use]
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self::new(&config.title_column, &config.abstract_column)
    }

    /// Keep the title and abstract of a row, dropping every other column.
    ///
    /// # Errors
    /// Returns [`EtlError::MissingColumn`] if either column is absent,
    /// null, or not a string.
    pub fn select(&self, index: u64, row: &Map<String, Value>) -> EtlResult<RawRow> {
        Ok(RawRow {
            title: text_column(row, &self.title, index)?,
            abstract_text: text_column(row, &self.abstract_text, index)?,
        })
    }
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self::from_config(&DatasetConfig::default())
    }
}

fn text_column(row: &Map<String, Value>, column: &str, index: u64) -> EtlResult<String> {
    row.get(column)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EtlError::MissingColumn {
            column: column.to_string(),
            row: index,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_select_keeps_two_columns() {
        let selection = ColumnSelection::default();
        let raw = selection
            .select(
                3,
                &row(json!({
                    "title": "Dropout",
                    "abstract": "A simple way to prevent overfitting.",
                    "Unnamed: 0": 3,
                })),
            )
            .unwrap();
        assert_eq!(raw.title, "Dropout");
        assert_eq!(raw.abstract_text, "A simple way to prevent overfitting.");
    }

    #[test]
    fn test_select_missing_column() {
        let selection = ColumnSelection::default();
        let err = selection
            .select(9, &row(json!({ "title": "Only a title" })))
            .unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { row: 9, .. }));
    }

    #[test]
    fn test_select_null_column() {
        let selection = ColumnSelection::new("name", "summary");
        let err = selection
            .select(0, &row(json!({ "name": "x", "summary": null })))
            .unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { ref column, .. } if column == "summary"));
    }
}
