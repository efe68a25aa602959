use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::DatasetConfig;
use crate::dataset::{ColumnSelection, DatasetSource, RawRow};
use crate::error::{EtlError, EtlResult};
use crate::resilience::RateLimiter;

const SOURCE_NAME: &str = "huggingface";

/// A dataset split served by the Hugging Face datasets-server API.
///
/// Rows are fetched one at a time by index. Requests are paced by a
/// [`RateLimiter`] and transient failures are retried with exponential
/// backoff.
#[derive(Debug, Clone)]
pub struct HubDataset {
    http: Client,
    endpoint: String,
    dataset: String,
    subset: String,
    split: String,
    columns: ColumnSelection,
    rate_limiter: RateLimiter,
    max_retries: usize,
    min_retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct SizeResponse {
    size: SizeBody,
}

#[derive(Debug, Deserialize)]
struct SizeBody {
    #[serde(default)]
    splits: Vec<SplitSize>,
}

#[derive(Debug, Deserialize)]
struct SplitSize {
    config: String,
    split: String,
    num_rows: u64,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<RowEntry>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row_idx: u64,
    row: Map<String, Value>,
}

impl HubDataset {
    /// Create a new datasets-server client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &DatasetConfig) -> EtlResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("paperseek/0.1.0 (https://github.com/oxur/paperseek)")
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            dataset: config.name.clone(),
            subset: config.subset.clone(),
            split: config.split.clone(),
            columns: ColumnSelection::from_config(config),
            rate_limiter: RateLimiter::new(config.requests_per_second),
            max_retries: config.max_retries,
            min_retry_delay: Duration::from_secs(1),
        })
    }

    /// Set the first backoff delay; later retries double it.
    #[must_use]
    pub fn with_min_retry_delay(mut self, delay: Duration) -> Self {
        self.min_retry_delay = delay;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> EtlResult<T> {
        let url = format!("{}/{}", self.endpoint, path);

        let fetch = || async {
            self.rate_limiter.acquire().await;
            let response = self.http.get(&url).query(query).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(EtlError::RateLimited {
                    source_name: SOURCE_NAME.to_string(),
                });
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(EtlError::Http {
                    source_name: SOURCE_NAME.to_string(),
                    status: Some(status.as_u16()),
                    message,
                });
            }

            response.json::<T>().await.map_err(|e| EtlError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })
        };

        fetch
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(self.min_retry_delay)
                    .with_max_times(self.max_retries),
            )
            .when(EtlError::is_transient)
            .notify(|err, delay| {
                log::warn!("Retrying {} in {:?} after error: {}", path, delay, err);
            })
            .await
    }
}

#[async_trait]
impl DatasetSource for HubDataset {
    fn describe(&self) -> String {
        format!("{} ({}/{})", self.dataset, self.subset, self.split)
    }

    async fn num_rows(&self) -> EtlResult<u64> {
        let response: SizeResponse = self
            .get_json("size", &[("dataset", self.dataset.clone())])
            .await?;

        find_split_rows(&response.size.splits, &self.subset, &self.split).ok_or_else(|| {
            EtlError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: format!(
                    "split {}/{} not found for {}",
                    self.subset, self.split, self.dataset
                ),
            }
        })
    }

    async fn fetch_row(&self, index: u64) -> EtlResult<RawRow> {
        let response: RowsResponse = self
            .get_json(
                "rows",
                &[
                    ("dataset", self.dataset.clone()),
                    ("config", self.subset.clone()),
                    ("split", self.split.clone()),
                    ("offset", index.to_string()),
                    ("length", "1".to_string()),
                ],
            )
            .await?;

        let entry = response
            .rows
            .into_iter()
            .find(|entry| entry.row_idx == index)
            .ok_or_else(|| EtlError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: format!("row {index} missing from response"),
            })?;

        self.columns.select(index, &entry.row)
    }
}

fn find_split_rows(splits: &[SplitSize], subset: &str, split: &str) -> Option<u64> {
    splits
        .iter()
        .find(|s| s.config == subset && s.split == split)
        .map(|s| s.num_rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_dataset_creation() {
        let dataset = HubDataset::new(&DatasetConfig::default());
        assert!(dataset.is_ok());
        assert_eq!(
            dataset.unwrap().describe(),
            "CShorten/ML-ArXiv-Papers (default/train)"
        );
    }

    #[test]
    fn test_parse_size_response() {
        let body = r#"{
            "size": {
                "dataset": {"dataset": "CShorten/ML-ArXiv-Papers", "num_rows": 117592},
                "configs": [],
                "splits": [
                    {"dataset": "CShorten/ML-ArXiv-Papers", "config": "default", "split": "train", "num_rows": 117592, "num_bytes_parquet_files": 1}
                ]
            },
            "pending": [],
            "failed": [],
            "partial": false
        }"#;
        let response: SizeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            find_split_rows(&response.size.splits, "default", "train"),
            Some(117_592)
        );
        assert_eq!(find_split_rows(&response.size.splits, "default", "test"), None);
    }

    #[test]
    fn test_parse_rows_response() {
        let body = r#"{
            "features": [],
            "rows": [
                {"row_idx": 17, "row": {"Unnamed: 0": 17, "title": "Deep Sets", "abstract": "Permutation invariant functions."}, "truncated_cells": []}
            ],
            "num_rows_total": 117592,
            "num_rows_per_page": 100,
            "partial": false
        }"#;
        let response: RowsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.rows[0].row_idx, 17);

        let raw = ColumnSelection::default()
            .select(17, &response.rows[0].row)
            .unwrap();
        assert_eq!(raw.title, "Deep Sets");
    }

    mod server {
        use crate::config::DatasetConfig;
        use crate::dataset::{DatasetSource, HubDataset};
        use crate::error::EtlError;
        use serde_json::json;
        use std::time::Duration;
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn dataset(server: &MockServer, max_retries: usize) -> HubDataset {
            let config = DatasetConfig {
                endpoint: server.uri(),
                requests_per_second: 1000,
                max_retries,
                ..DatasetConfig::default()
            };
            HubDataset::new(&config)
                .unwrap()
                .with_min_retry_delay(Duration::from_millis(5))
        }

        fn size_body(num_rows: u64) -> serde_json::Value {
            json!({
                "size": {
                    "splits": [
                        {"config": "default", "split": "test", "num_rows": 3},
                        {"config": "default", "split": "train", "num_rows": num_rows}
                    ]
                }
            })
        }

        fn rows_body(row_idx: u64, title: &str) -> serde_json::Value {
            json!({
                "rows": [
                    {"row_idx": row_idx, "row": {"title": title, "abstract": "An abstract."}}
                ]
            })
        }

        #[tokio::test]
        async fn test_num_rows_reads_configured_split() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/size"))
                .and(query_param("dataset", "CShorten/ML-ArXiv-Papers"))
                .respond_with(ResponseTemplate::new(200).set_body_json(size_body(117_592)))
                .expect(1)
                .mount(&server)
                .await;

            assert_eq!(dataset(&server, 2).num_rows().await.unwrap(), 117_592);
        }

        #[tokio::test]
        async fn test_fetch_row_by_offset() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rows"))
                .and(query_param("config", "default"))
                .and(query_param("split", "train"))
                .and(query_param("offset", "17"))
                .and(query_param("length", "1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(rows_body(17, "Deep Sets")))
                .expect(1)
                .mount(&server)
                .await;

            let row = dataset(&server, 2).fetch_row(17).await.unwrap();
            assert_eq!(row.title, "Deep Sets");
            assert_eq!(row.abstract_text, "An abstract.");
        }

        #[tokio::test]
        async fn test_fetch_row_missing_from_response() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rows"))
                .respond_with(ResponseTemplate::new(200).set_body_json(rows_body(18, "Neighbour")))
                .expect(1)
                .mount(&server)
                .await;

            let err = dataset(&server, 2).fetch_row(17).await.unwrap_err();
            assert!(matches!(err, EtlError::Parse { .. }));
        }

        #[tokio::test]
        async fn test_server_errors_are_retried() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/size"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(2)
                .expect(2)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/size"))
                .respond_with(ResponseTemplate::new(200).set_body_json(size_body(10)))
                .expect(1)
                .mount(&server)
                .await;

            assert_eq!(dataset(&server, 3).num_rows().await.unwrap(), 10);
        }

        #[tokio::test]
        async fn test_gives_up_after_max_retries() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/size"))
                .respond_with(ResponseTemplate::new(500))
                .expect(3)
                .mount(&server)
                .await;

            let err = dataset(&server, 2).num_rows().await.unwrap_err();
            assert!(matches!(err, EtlError::Http { status: Some(500), .. }));
        }

        #[tokio::test]
        async fn test_rate_limit_maps_and_retries() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rows"))
                .respond_with(ResponseTemplate::new(429))
                .expect(2)
                .mount(&server)
                .await;

            let err = dataset(&server, 1).fetch_row(0).await.unwrap_err();
            assert!(matches!(err, EtlError::RateLimited { .. }));
        }

        #[tokio::test]
        async fn test_not_found_is_not_retried() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rows"))
                .respond_with(ResponseTemplate::new(404).set_body_string("no such dataset"))
                .expect(1)
                .mount(&server)
                .await;

            let err = dataset(&server, 3).fetch_row(0).await.unwrap_err();
            assert!(matches!(
                err,
                EtlError::Http { status: Some(404), ref message, .. } if message == "no such dataset"
            ));
        }
    }
}
