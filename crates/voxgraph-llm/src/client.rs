// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the LLM generator service.
//!
//! Implements [`GeneratorAdapter`] over a REST API with SSE streaming. The
//! client makes exactly one attempt per call; the retry policy lives in the
//! extractor, which caps a failing generator at three attempts total.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use voxgraph_core::types::HealthStatus;
use voxgraph_core::{
    GenerationConfig, GeneratorAdapter, ServiceAdapter, TextChunkStream, VoxgraphError,
};

use crate::types::{Content, GenerateRequest, GenerateResponse, Part, WireGenerationConfig};

/// HTTP client for the generator REST API.
#[derive(Debug, Clone)]
pub struct GeneratorClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeneratorClient {
    /// Creates a generator client for the given endpoint and model.
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        model: &str,
    ) -> Result<Self, VoxgraphError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(key).map_err(|e| {
                    VoxgraphError::Config(format!("invalid generator API key: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| VoxgraphError::Generator {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn request_body(&self, prompt: &str, config: &GenerationConfig) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: WireGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                top_p: config.top_p,
                top_k: config.top_k,
            },
        }
    }

    async fn post(
        &self,
        url: &str,
        body: &GenerateRequest,
    ) -> Result<reqwest::Response, VoxgraphError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| VoxgraphError::Generator {
                message: format!("generator request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "generator response received");

        if status.is_success() {
            return Ok(response);
        }

        let body_text = response.text().await.unwrap_or_default();
        Err(VoxgraphError::Generator {
            message: format!("generator returned {status}: {body_text}"),
            source: None,
        })
    }
}

#[async_trait]
impl ServiceAdapter for GeneratorClient {
    fn name(&self) -> &str {
        "generator-client"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        let url = format!("{}/v1/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "generator returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("generator unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl GeneratorAdapter for GeneratorClient {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, VoxgraphError> {
        let url = format!(
            "{}/v1/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = self.request_body(prompt, config);
        let response = self.post(&url, &body).await?;

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| VoxgraphError::Generator {
                message: format!("generator response parse failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.text())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextChunkStream, VoxgraphError> {
        let url = format!(
            "{}/v1/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let body = self.request_body(prompt, config);
        let response = self.post(&url, &body).await?;

        let events = response.bytes_stream().eventsource();
        let chunks = events.filter_map(|result| async move {
            match result {
                Ok(event) => {
                    // The server marks end-of-stream with a literal sentinel.
                    if event.data.trim() == "[DONE]" {
                        return None;
                    }
                    match serde_json::from_str::<GenerateResponse>(&event.data) {
                        Ok(parsed) => {
                            let text = parsed.text();
                            if text.is_empty() {
                                None
                            } else {
                                Some(Ok(text))
                            }
                        }
                        Err(e) => Some(Err(VoxgraphError::Generator {
                            message: format!("stream event parse failed: {e}"),
                            source: Some(Box::new(e)),
                        })),
                    }
                }
                Err(e) => Some(Err(VoxgraphError::Generator {
                    message: format!("SSE stream error: {e}"),
                    source: None,
                })),
            }
        });

        Ok(Box::pin(chunks))
    }
}
