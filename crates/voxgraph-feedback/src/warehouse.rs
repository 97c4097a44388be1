// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the append-only event warehouse.
//!
//! Three tables: `session_events`, `extraction_results`, `user_feedback`.
//! Writes are single-row appends; reads serve the feedback improvement loop
//! and the analytics endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use voxgraph_core::types::{
    ExtractionRecord, FeedbackAnalytics, FeedbackRecord, HealthStatus,
};
use voxgraph_core::{ServiceAdapter, VoxgraphError, Warehouse};

/// HTTP client for the warehouse REST API.
#[derive(Debug, Clone)]
pub struct WarehouseClient {
    client: reqwest::Client,
    base_url: String,
    dataset: String,
}

impl WarehouseClient {
    /// Creates a client for the given endpoint and dataset.
    pub fn new(
        endpoint: &str,
        dataset: &str,
        api_key: Option<&str>,
    ) -> Result<Self, VoxgraphError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "content-type",
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = api_key {
            headers.insert(
                "x-api-key",
                reqwest::header::HeaderValue::from_str(key).map_err(|e| {
                    VoxgraphError::Config(format!("invalid warehouse API key: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoxgraphError::Storage {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            dataset: dataset.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/v1/datasets/{}/tables/{table}/rows",
            self.base_url, self.dataset
        )
    }

    async fn insert_row(
        &self,
        table: &str,
        row: serde_json::Value,
    ) -> Result<(), VoxgraphError> {
        let response = self
            .client
            .post(self.table_url(table))
            .json(&row)
            .send()
            .await
            .map_err(|e| VoxgraphError::Storage {
                message: format!("warehouse insert into {table} failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxgraphError::Storage {
                message: format!("warehouse insert into {table} returned {status}: {body}"),
                source: None,
            });
        }
        debug!(table, "warehouse row inserted");
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, VoxgraphError> {
        let response =
            self.client.get(url).send().await.map_err(|e| VoxgraphError::Storage {
                message: format!("warehouse query failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxgraphError::Storage {
                message: format!("warehouse query returned {status}: {body}"),
                source: None,
            });
        }

        response.json().await.map_err(|e| VoxgraphError::Storage {
            message: format!("warehouse response parse failed: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl ServiceAdapter for WarehouseClient {
    fn name(&self) -> &str {
        "warehouse-client"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        let url = format!("{}/v1/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "warehouse returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("warehouse unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl Warehouse for WarehouseClient {
    async fn insert_session_event(
        &self,
        session_id: &str,
        event_type: &str,
        event_data: &serde_json::Value,
    ) -> Result<(), VoxgraphError> {
        self.insert_row(
            "session_events",
            json!({
                "session_id": session_id,
                "event_type": event_type,
                "event_data": event_data.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        )
        .await
    }

    async fn insert_extraction_result(
        &self,
        record: &ExtractionRecord,
    ) -> Result<(), VoxgraphError> {
        let mut row = serde_json::to_value(record).map_err(|e| VoxgraphError::Storage {
            message: format!("extraction record serialization failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        if let Some(object) = row.as_object_mut() {
            object.insert(
                "timestamp".to_string(),
                json!(chrono::Utc::now().to_rfc3339()),
            );
        }
        self.insert_row("extraction_results", row).await
    }

    async fn insert_feedback(&self, record: &FeedbackRecord) -> Result<(), VoxgraphError> {
        let row = serde_json::to_value(record).map_err(|e| VoxgraphError::Storage {
            message: format!("feedback record serialization failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        self.insert_row("user_feedback", row).await
    }

    async fn recent_feedback(
        &self,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, VoxgraphError> {
        let url = format!(
            "{}/v1/datasets/{}/feedback/recent?limit={limit}",
            self.base_url, self.dataset
        );
        self.get_json(&url).await
    }

    async fn low_rating_patterns(&self) -> Result<Vec<FeedbackRecord>, VoxgraphError> {
        let url = format!(
            "{}/v1/datasets/{}/feedback/low-rated",
            self.base_url, self.dataset
        );
        self.get_json(&url).await
    }

    async fn feedback_analytics(&self) -> Result<FeedbackAnalytics, VoxgraphError> {
        let url = format!(
            "{}/v1/datasets/{}/feedback/analytics",
            self.base_url, self.dataset
        );
        self.get_json(&url).await
    }
}
