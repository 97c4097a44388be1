// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM generator adapter trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::VoxgraphError;
use crate::traits::adapter::ServiceAdapter;

/// A stream of raw text chunks from a generating LLM.
pub type TextChunkStream = Pin<Box<dyn Stream<Item = Result<String, VoxgraphError>> + Send>>;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    pub top_k: u32,
}

impl GenerationConfig {
    /// Low-temperature settings for structured extraction output.
    pub fn extraction() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 2048,
            top_p: 0.8,
            top_k: 40,
        }
    }

    /// Settings for short free-form summaries.
    pub fn summary() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 300,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

/// Adapter for LLM text generation backends.
///
/// Supports both single-shot completion and streamed chunk delivery; the
/// stream terminates when the model finishes or errors.
#[async_trait]
pub trait GeneratorAdapter: ServiceAdapter {
    /// Generates the full response for a prompt.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, VoxgraphError>;

    /// Generates a response as a stream of text chunks.
    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextChunkStream, VoxgraphError>;
}
