// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted [`SpeechAdapter`] for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use voxgraph_core::types::{AudioFormat, HealthStatus, Transcript};
use voxgraph_core::{ServiceAdapter, SpeechAdapter, VoxgraphError};

/// A [`SpeechAdapter`] that pops scripted results from a FIFO queue.
///
/// An exhausted queue yields `None` (no speech detected), matching a
/// recognizer that hears silence.
pub struct MockSpeech {
    results: Arc<Mutex<VecDeque<Option<Transcript>>>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Pre-load transcripts; each audio chunk consumes one entry.
    pub fn with_transcripts(texts: Vec<(&str, Option<&str>)>) -> Self {
        let results = texts
            .into_iter()
            .map(|(text, lang)| {
                Some(Transcript {
                    text: text.to_string(),
                    confidence: 0.92,
                    language_code: lang.map(str::to_string),
                })
            })
            .collect();
        Self {
            results: Arc::new(Mutex::new(results)),
        }
    }

    /// Append a scripted result (use `None` for a silent segment).
    pub async fn push_result(&self, result: Option<Transcript>) {
        self.results.lock().await.push_back(result);
    }
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceAdapter for MockSpeech {
    fn name(&self) -> &str {
        "mock-speech"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SpeechAdapter for MockSpeech {
    async fn transcribe_chunk(
        &self,
        _audio: &[u8],
        _format: &AudioFormat,
        _segment_id: &str,
        _language_codes: &[String],
    ) -> Result<Option<Transcript>, VoxgraphError> {
        Ok(self.results.lock().await.pop_front().flatten())
    }
}
