//! Hugging Face dataset source.
//!
//! Talks to the datasets-server HTTP API:
//! - `GET /splits?dataset=..` lists the sub-configurations
//! - `GET /rows?dataset=..&config=..&split=..&offset=..&length=..` pages rows
//!
//! The server caps `length` at 100, so large configs take many requests.
//! No retries: a failed page fails the whole fetch.
//!
//! Incomplete data is an error, never a silent success: a row with
//! truncated cells fails the fetch, and so does a `partial` split unless
//! the row limit was already met from the rows the server has.

use async_trait::async_trait;
use dbclaw_config::DatasetConfig;
use dbclaw_core::dataset::DatasetSource;
use dbclaw_core::error::DatasetError;
use dbclaw_core::table::Table;
use dbclaw_core::value::Value;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct SplitsResponse {
    #[serde(default)]
    splits: Vec<SplitEntry>,
}

#[derive(Debug, Deserialize)]
struct SplitEntry {
    config: String,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    rows: Vec<RowEntry>,
    #[serde(default)]
    num_rows_total: Option<usize>,
    /// The server only holds a prefix of the split.
    #[serde(default)]
    partial: bool,
}

#[derive(Debug, Deserialize)]
struct Feature {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    #[serde(default)]
    row_idx: Option<usize>,
    row: serde_json::Map<String, serde_json::Value>,
    /// Cells whose value the server cut short.
    #[serde(default)]
    truncated_cells: Vec<String>,
}

/// A `DatasetSource` backed by the Hugging Face datasets-server.
pub struct HubDatasetSource {
    client: reqwest::Client,
    dataset: String,
    split: String,
    endpoint: String,
    page_size: usize,
    token: Option<String>,
}

impl HubDatasetSource {
    pub fn new(config: &DatasetConfig) -> Result<Self, DatasetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("dbclaw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DatasetError::Request {
                url: config.endpoint.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            dataset: config.name.clone(),
            split: config.split.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            page_size: config.page_size.clamp(1, 100),
            token: config.token.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, DatasetError> {
        let url = format!("{}/{}", self.endpoint, path);
        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| DatasetError::Request {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DatasetError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl DatasetSource for HubDatasetSource {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    async fn config_names(&self) -> Result<Vec<String>, DatasetError> {
        let response: SplitsResponse = self
            .get_json("splits", &[("dataset", self.dataset.clone())])
            .await?;

        let mut configs: Vec<String> = Vec::new();
        for entry in response.splits {
            if !configs.contains(&entry.config) {
                configs.push(entry.config);
            }
        }
        info!(dataset = %self.dataset, count = configs.len(), "Enumerated dataset configs");
        Ok(configs)
    }

    async fn fetch(&self, config: &str, limit: Option<usize>) -> Result<Table, DatasetError> {
        let mut columns: Option<Vec<String>> = None;
        let mut rows: Vec<Vec<(String, Value)>> = Vec::new();
        let mut offset = 0usize;
        let mut partial = false;

        loop {
            let want = match limit {
                Some(n) if rows.len() >= n => break,
                Some(n) => (n - rows.len()).min(self.page_size),
                None => self.page_size,
            };

            let RowsResponse {
                features,
                rows: page,
                num_rows_total,
                partial: page_partial,
            } = self
                .get_json(
                    "rows",
                    &[
                        ("dataset", self.dataset.clone()),
                        ("config", config.to_string()),
                        ("split", self.split.clone()),
                        ("offset", offset.to_string()),
                        ("length", want.to_string()),
                    ],
                )
                .await?;

            if columns.is_none() {
                columns = Some(features.into_iter().map(|f| f.name).collect());
            }

            partial |= page_partial;

            let got = page.len();
            for entry in page {
                if !entry.truncated_cells.is_empty() {
                    return Err(DatasetError::Decode(format!(
                        "config '{config}': row {} has truncated cells {:?}",
                        entry.row_idx.unwrap_or(offset + rows.len()),
                        entry.truncated_cells
                    )));
                }
                rows.push(
                    entry
                        .row
                        .into_iter()
                        .map(|(k, v)| (k, Value::from_json(v)))
                        .collect(),
                );
            }
            offset += got;
            debug!(config, offset, total = ?num_rows_total, "Fetched rows page");

            let exhausted = num_rows_total.is_some_and(|total| offset >= total);
            if got < want || exhausted {
                break;
            }
        }

        let limit_met = limit.is_some_and(|n| rows.len() >= n);
        if partial && !limit_met {
            warn!(config, rows = rows.len(), "Server holds only part of the split");
            return Err(DatasetError::Decode(format!(
                "config '{config}': split '{}' is only partially available ({} rows)",
                self.split,
                rows.len()
            )));
        }

        if let Some(n) = limit {
            rows.truncate(n);
        }
        Ok(Table::from_rows(columns.unwrap_or_default(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer, page_size: usize) -> HubDatasetSource {
        let config = DatasetConfig {
            name: "org/data".into(),
            endpoint: server.uri(),
            page_size,
            ..DatasetConfig::default()
        };
        HubDatasetSource::new(&config).unwrap()
    }

    fn rows_page(ids: &[i64], total: usize) -> serde_json::Value {
        page_with(ids, total, false, &[])
    }

    fn page_with(
        ids: &[i64],
        total: usize,
        partial: bool,
        truncated: &[&str],
    ) -> serde_json::Value {
        serde_json::json!({
            "features": [
                {"feature_idx": 0, "name": "id", "type": {"dtype": "int64"}},
                {"feature_idx": 1, "name": "tags", "type": {"feature": {"dtype": "string"}}}
            ],
            "rows": ids.iter().map(|id| serde_json::json!({
                "row_idx": id,
                "row": {"id": id, "tags": ["t"]},
                "truncated_cells": truncated
            })).collect::<Vec<_>>(),
            "num_rows_total": total,
            "partial": partial
        })
    }

    #[tokio::test]
    async fn config_names_are_deduplicated_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/splits"))
            .and(query_param("dataset", "org/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "splits": [
                    {"dataset": "org/data", "config": "models", "split": "train"},
                    {"dataset": "org/data", "config": "models", "split": "test"},
                    {"dataset": "org/data", "config": "datasets", "split": "train"}
                ],
                "pending": [],
                "failed": []
            })))
            .mount(&server)
            .await;

        let source = source_for(&server, 100);
        let configs = source.config_names().await.unwrap();
        assert_eq!(configs, vec!["models", "datasets"]);
    }

    #[tokio::test]
    async fn fetch_pages_until_total_reached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows_page(&[1, 2], 3)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows_page(&[3], 3)))
            .expect(1)
            .mount(&server)
            .await;

        let source = source_for(&server, 2);
        let table = source.fetch("models", None).await.unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_names(), vec!["id", "tags"]);
        assert_eq!(
            table.column("id").unwrap().values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert!(table.column("tags").unwrap().values[0].is_list());
    }

    #[tokio::test]
    async fn fetch_stops_at_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(query_param("offset", "0"))
            .and(query_param("length", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows_page(&[1], 50)))
            .expect(1)
            .mount(&server)
            .await;

        let source = source_for(&server, 100);
        let table = source.fetch("models", Some(1)).await.unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = source_for(&server, 100);
        let err = source.fetch("missing", None).await.unwrap_err();
        assert!(matches!(err, DatasetError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/splits"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let source = source_for(&server, 100);
        assert!(matches!(
            source.config_names().await,
            Err(DatasetError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/splits"))
            .and(header("authorization", "Bearer hf_test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"splits": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = DatasetConfig {
            name: "org/private".into(),
            endpoint: server.uri(),
            token: Some("hf_test".into()),
            ..DatasetConfig::default()
        };
        let source = HubDatasetSource::new(&config).unwrap();
        assert!(source.config_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn truncated_cells_fail_the_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page_with(&[1], 1, false, &["readme"])),
            )
            .mount(&server)
            .await;

        let source = source_for(&server, 100);
        match source.fetch("models", None).await {
            Err(DatasetError::Decode(msg)) => {
                assert!(msg.contains("models"));
                assert!(msg.contains("readme"));
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_split_fails_the_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_with(&[1], 1, true, &[])))
            .mount(&server)
            .await;

        let source = source_for(&server, 100);
        match source.fetch("models", None).await {
            Err(DatasetError::Decode(msg)) => {
                assert!(msg.contains("models"));
                assert!(msg.contains("partially"));
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_split_is_fine_when_limit_is_met() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page_with(&[1, 2], 2, true, &[])),
            )
            .mount(&server)
            .await;

        let source = source_for(&server, 100);
        let table = source.fetch("models", Some(2)).await.unwrap();
        assert_eq!(table.row_count(), 2);
    }
}
