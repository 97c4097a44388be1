// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the blob store holding feedback artifacts.
//!
//! Objects are keyed by session and timestamp:
//! - `audio/YYYY/MM/DD/HH/<session>_<short>.<codec>`
//! - `graphs/YYYY/MM/DD/<session>_v<version>.json`
//! - `logs/YYYY/MM/DD/HH/<session>.json`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use voxgraph_core::types::{HealthStatus, SessionGraph};
use voxgraph_core::{ObjectStore, ServiceAdapter, VoxgraphError};

/// HTTP client for the object store's upload API.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl ObjectStoreClient {
    /// Creates a client for the given endpoint and bucket.
    pub fn new(
        endpoint: &str,
        bucket: &str,
        api_key: Option<&str>,
    ) -> Result<Self, VoxgraphError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(key).map_err(|e| {
                    VoxgraphError::Config(format!("invalid object store API key: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoxgraphError::Storage {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// Uploads raw bytes under the given object path and returns its URI.
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, VoxgraphError> {
        let url = format!(
            "{}/upload/v1/b/{}/o?name={}",
            self.base_url, self.bucket, path
        );
        let response = self
            .client
            .post(&url)
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| VoxgraphError::Storage {
                message: format!("upload request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxgraphError::Storage {
                message: format!("upload of {path} returned {status}: {body}"),
                source: None,
            });
        }

        let uri = format!("store://{}/{}", self.bucket, path);
        debug!(path, "object uploaded");
        Ok(uri)
    }

    fn content_type_for(codec: &str) -> &'static str {
        match codec {
            "wav" => "audio/wav",
            "webm" => "audio/webm",
            "opus" => "audio/opus",
            "mp3" => "audio/mpeg",
            "pcm" => "audio/pcm",
            _ => "application/octet-stream",
        }
    }
}

#[async_trait]
impl ServiceAdapter for ObjectStoreClient {
    fn name(&self) -> &str {
        "object-store-client"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        let url = format!("{}/v1/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "object store returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "object store unreachable: {e}"
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for ObjectStoreClient {
    async fn upload_audio(
        &self,
        session_id: &str,
        audio: &[u8],
        codec: &str,
    ) -> Result<String, VoxgraphError> {
        let hour_prefix = chrono::Utc::now().format("%Y/%m/%d/%H");
        let short_id = uuid::Uuid::new_v4().simple().to_string();
        let path = format!(
            "audio/{hour_prefix}/{session_id}_{}.{codec}",
            &short_id[..8]
        );
        self.upload(&path, Self::content_type_for(codec), audio.to_vec())
            .await
    }

    async fn upload_graph(
        &self,
        session_id: &str,
        graph: &SessionGraph,
    ) -> Result<String, VoxgraphError> {
        let day_prefix = chrono::Utc::now().format("%Y/%m/%d");
        let path = format!("graphs/{day_prefix}/{session_id}_v{}.json", graph.version);
        let body = serde_json::to_vec(graph).map_err(|e| VoxgraphError::Storage {
            message: format!("graph serialization failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        self.upload(&path, "application/json", body).await
    }

    async fn upload_session_log(
        &self,
        session_id: &str,
        log: &serde_json::Value,
    ) -> Result<String, VoxgraphError> {
        let hour_prefix = chrono::Utc::now().format("%Y/%m/%d/%H");
        let path = format!("logs/{hour_prefix}/{session_id}.json");
        let body = serde_json::to_vec(log).map_err(|e| VoxgraphError::Storage {
            message: format!("log serialization failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        self.upload(&path, "application/json", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn audio_upload_builds_dated_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/upload/v1/b/test-bucket/o$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ObjectStoreClient::new(&server.uri(), "test-bucket", None).unwrap();
        let uri = client.upload_audio("s-1", b"bytes", "webm").await.unwrap();
        assert!(uri.starts_with("store://test-bucket/audio/"));
        assert!(uri.contains("s-1_"));
        assert!(uri.ends_with(".webm"));
    }

    #[tokio::test]
    async fn graph_upload_embeds_version() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = ObjectStoreClient::new(&server.uri(), "test-bucket", None).unwrap();
        let graph = SessionGraph {
            version: 7,
            ..SessionGraph::empty(0)
        };
        let uri = client.upload_graph("s-1", &graph).await.unwrap();
        assert!(uri.ends_with("s-1_v7.json"));
    }

    #[tokio::test]
    async fn failed_upload_is_a_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(507))
            .mount(&server)
            .await;

        let client = ObjectStoreClient::new(&server.uri(), "test-bucket", None).unwrap();
        let err = client
            .upload_audio("s-1", b"bytes", "wav")
            .await
            .expect_err("507 must fail");
        assert!(matches!(err, VoxgraphError::Storage { .. }));
    }

    #[test]
    fn codec_content_types() {
        assert_eq!(ObjectStoreClient::content_type_for("wav"), "audio/wav");
        assert_eq!(ObjectStoreClient::content_type_for("mp3"), "audio/mpeg");
        assert_eq!(
            ObjectStoreClient::content_type_for("mystery"),
            "application/octet-stream"
        );
    }
}
