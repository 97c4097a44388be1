// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge extraction over the generator adapter.
//!
//! The streaming path feeds generator chunks through the incremental parser
//! and surfaces partial results through a callback as they become complete.
//! A malformed or aborted stream falls back to one single-shot call; repeat
//! failure yields an empty extraction rather than an error, so a flaky LLM
//! shows up as missing graph updates, never as a dead pipeline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, warn};

use voxgraph_core::types::{
    ExtractedEntity, ExtractedRelation, ExtractionResult, GraphEntity, GraphRelation,
};
use voxgraph_core::{GenerationConfig, GeneratorAdapter};

use crate::prompt::build_extraction_prompt;
use crate::stream_parser::{parse_document, StreamingParser};

/// Single-shot attempts before giving up with an empty result.
const SINGLE_SHOT_ATTEMPTS: u32 = 3;

/// Delay between single-shot attempts.
const SINGLE_SHOT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Extracts entities and relations from sentence batches.
pub struct KnowledgeExtractor {
    generator: Arc<dyn GeneratorAdapter>,
}

impl KnowledgeExtractor {
    pub fn new(generator: Arc<dyn GeneratorAdapter>) -> Self {
        Self { generator }
    }

    /// Streaming extraction.
    ///
    /// `on_partial` is invoked for every batch of newly complete entities and
    /// relations as they are parsed out of the stream. The returned result is
    /// the full set parsed over the whole stream.
    pub async fn extract_streaming<'a>(
        &self,
        text: &str,
        existing_entities: &[GraphEntity],
        existing_relations: &[GraphRelation],
        guidance: Option<&str>,
        mut on_partial: impl FnMut(
                Vec<ExtractedEntity>,
                Vec<ExtractedRelation>,
            ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>
            + 'a,
    ) -> ExtractionResult {
        let prompt =
            build_extraction_prompt(text, existing_entities, existing_relations, guidance);
        let config = GenerationConfig::extraction();

        let mut parser = StreamingParser::new();
        let mut stream_failed = false;

        match self.generator.generate_stream(&prompt, &config).await {
            Ok(mut stream) => {
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(text_chunk) => {
                            let (new_entities, new_relations) = parser.feed(&text_chunk);
                            if !new_entities.is_empty() || !new_relations.is_empty() {
                                on_partial(new_entities, new_relations).await;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "extraction stream aborted");
                            stream_failed = true;
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "extraction stream failed to start");
                stream_failed = true;
            }
        }

        // A stream that died before producing anything parseable gets one
        // single-shot chance; partials already delivered stand as-is.
        if stream_failed && parser.is_empty() {
            let result = self
                .extract(text, existing_entities, existing_relations, guidance)
                .await;
            if !result.is_empty() {
                on_partial(result.entities.clone(), result.relations.clone()).await;
            }
            return result;
        }

        let result = parser.result();
        debug!(
            entities = result.entities.len(),
            relations = result.relations.len(),
            "streaming extraction complete"
        );
        result
    }

    /// Single-shot extraction with retry.
    ///
    /// Exhausted retries return an empty result, never an error.
    pub async fn extract(
        &self,
        text: &str,
        existing_entities: &[GraphEntity],
        existing_relations: &[GraphRelation],
        guidance: Option<&str>,
    ) -> ExtractionResult {
        let prompt =
            build_extraction_prompt(text, existing_entities, existing_relations, guidance);
        let config = GenerationConfig::extraction();

        for attempt in 0..SINGLE_SHOT_ATTEMPTS {
            match self.generator.generate(&prompt, &config).await {
                Ok(response) => {
                    let result = parse_document(&response);
                    if !result.is_empty() || response_declares_empty(&response) {
                        return result;
                    }
                    warn!(
                        attempt = attempt + 1,
                        "extraction response had no parseable objects"
                    );
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "extraction attempt failed");
                }
            }
            if attempt + 1 < SINGLE_SHOT_ATTEMPTS {
                tokio::time::sleep(SINGLE_SHOT_RETRY_DELAY).await;
            }
        }

        warn!(text_len = text.len(), "extraction failed after retries, returning empty");
        ExtractionResult::default()
    }
}

/// True when the response is a well-formed empty extraction, as opposed to
/// unparseable noise.
fn response_declares_empty(response: &str) -> bool {
    response.contains("\"entities\"") && response.contains("[]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use voxgraph_core::types::EntityType;
    use voxgraph_core::VoxgraphError;
    use voxgraph_test_utils::MockGenerator;

    #[tokio::test]
    async fn streaming_extraction_delivers_partials_in_order() {
        let generator = Arc::new(MockGenerator::new());
        generator
            .push_chunks(vec![
                "```json\n{ \"entities\": [ { \"id\": \"e1\", \"label\": \"Apple\", \"type\": \"ORGANIZATION\" },",
                " { \"id\": \"e2\", \"label\": \"iPhone 15\", \"type\": \"PRODUCT\" } ],",
                " \"relations\": [ { \"source\": \"e1\", \"target\": \"e2\", \"relation\": \"released\" } ] }\n```",
            ])
            .await;

        let extractor = KnowledgeExtractor::new(generator);
        let partials: Arc<StdMutex<Vec<(usize, usize)>>> = Arc::new(StdMutex::new(Vec::new()));
        let partials_ref = partials.clone();

        let result = extractor
            .extract_streaming(
                "Apple released iPhone 15.",
                &[],
                &[],
                None,
                |entities, relations| {
                    partials_ref
                        .lock()
                        .unwrap()
                        .push((entities.len(), relations.len()));
                    Box::pin(async {})
                },
            )
            .await;

        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.relations.len(), 1);
        let calls = partials.lock().unwrap().clone();
        // Entities complete before the relation does.
        assert_eq!(calls, vec![(1, 0), (1, 0), (0, 1)]);
    }

    #[tokio::test]
    async fn declared_empty_stream_yields_empty_result() {
        // Stream script exhausted -> MockGenerator streams an empty document.
        let generator = Arc::new(MockGenerator::new());
        let extractor = KnowledgeExtractor::new(generator.clone());
        let result = extractor
            .extract_streaming("text", &[], &[], None, |_, _| Box::pin(async {}))
            .await;
        assert!(result.is_empty());
    }

    /// Generator whose stream always errors but whose single-shot works.
    struct BrokenStreamGenerator {
        inner: MockGenerator,
    }

    #[async_trait::async_trait]
    impl voxgraph_core::ServiceAdapter for BrokenStreamGenerator {
        fn name(&self) -> &str {
            "broken-stream-generator"
        }

        async fn health_check(
            &self,
        ) -> Result<voxgraph_core::types::HealthStatus, VoxgraphError> {
            Ok(voxgraph_core::types::HealthStatus::Healthy)
        }
    }

    #[async_trait::async_trait]
    impl GeneratorAdapter for BrokenStreamGenerator {
        async fn generate(
            &self,
            prompt: &str,
            config: &GenerationConfig,
        ) -> Result<String, VoxgraphError> {
            self.inner.generate(prompt, config).await
        }

        async fn generate_stream(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<voxgraph_core::TextChunkStream, VoxgraphError> {
            Err(VoxgraphError::Generator {
                message: "stream unavailable".into(),
                source: None,
            })
        }
    }

    #[tokio::test]
    async fn failed_stream_falls_back_to_single_shot() {
        let inner = MockGenerator::new();
        inner
            .push_response(
                r#"{"entities": [{"id": "e1", "label": "Alice", "type": "PERSON"}], "relations": []}"#,
            )
            .await;
        let extractor = KnowledgeExtractor::new(Arc::new(BrokenStreamGenerator { inner }));

        let partials: Arc<StdMutex<Vec<usize>>> = Arc::new(StdMutex::new(Vec::new()));
        let partials_ref = partials.clone();
        let result = extractor
            .extract_streaming("Alice.", &[], &[], None, |entities, _| {
                partials_ref.lock().unwrap().push(entities.len());
                Box::pin(async {})
            })
            .await;

        assert_eq!(result.entities.len(), 1);
        // The fallback result is still surfaced through the partial callback.
        assert_eq!(*partials.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn single_shot_parses_response() {
        let generator = Arc::new(MockGenerator::new());
        generator
            .push_response(
                r#"{"entities": [{"id": "e1", "label": "Alice", "type": "PERSON"}], "relations": []}"#,
            )
            .await;

        let extractor = KnowledgeExtractor::new(generator);
        let result = extractor.extract("Alice.", &[], &[], None).await;
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].entity_type, EntityType::Person);
    }

    #[tokio::test]
    async fn single_shot_accepts_declared_empty() {
        let generator = Arc::new(MockGenerator::new());
        generator
            .push_response(r#"{ "entities": [], "relations": [] }"#)
            .await;

        let extractor = KnowledgeExtractor::new(generator);
        let result = extractor.extract("...", &[], &[], None).await;
        assert!(result.is_empty());
    }
}
