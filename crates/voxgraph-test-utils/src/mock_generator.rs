// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted [`GeneratorAdapter`] for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use voxgraph_core::types::HealthStatus;
use voxgraph_core::{
    GenerationConfig, GeneratorAdapter, ServiceAdapter, TextChunkStream, VoxgraphError,
};

/// A [`GeneratorAdapter`] that replays scripted responses.
///
/// Single-shot calls pop from a response queue; streaming calls pop from a
/// chunk-script queue so tests control exactly how the output is carved
/// across chunks. An exhausted queue yields an empty extraction document.
pub struct MockGenerator {
    responses: Arc<Mutex<VecDeque<String>>>,
    chunk_scripts: Arc<Mutex<VecDeque<Vec<String>>>>,
}

const EMPTY_EXTRACTION: &str = r#"{ "entities": [], "relations": [] }"#;

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            chunk_scripts: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queue a single-shot response.
    pub async fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Queue a streaming response as an explicit chunk sequence.
    pub async fn push_chunks(&self, chunks: Vec<&str>) {
        self.chunk_scripts
            .lock()
            .await
            .push_back(chunks.into_iter().map(str::to_string).collect());
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl GeneratorAdapter for MockGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, VoxgraphError> {
        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| EMPTY_EXTRACTION.to_string()))
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<TextChunkStream, VoxgraphError> {
        let chunks = self
            .chunk_scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| vec![EMPTY_EXTRACTION.to_string()]);
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}
