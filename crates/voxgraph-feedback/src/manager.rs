// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback workflow: artifact upload, warehouse rows, and the improvement
//! loop that turns past ratings into extraction guidance.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

use voxgraph_core::types::{FeedbackAnalytics, FeedbackRecord, SessionGraph};
use voxgraph_core::{
    GenerationConfig, GeneratorAdapter, ObjectStore, VoxgraphError, Warehouse,
};
use voxgraph_llm::prompt::build_feedback_summary_prompt;

/// TTL of the cached improvement-context string.
const GUIDANCE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Feedback rows fetched when building guidance.
const RECENT_FEEDBACK_LIMIT: usize = 50;

/// Feedback rows actually summarized (most recent first).
const SUMMARIZED_FEEDBACK_LIMIT: usize = 10;

/// URIs of the artifacts stored for one feedback submission.
#[derive(Debug, Clone, Default)]
pub struct FeedbackUris {
    pub audio_uri: Option<String>,
    pub graph_uri: Option<String>,
}

/// Coordinates feedback storage and the extraction-guidance loop.
pub struct FeedbackManager {
    object_store: Arc<dyn ObjectStore>,
    warehouse: Arc<dyn Warehouse>,
    generator: Arc<dyn GeneratorAdapter>,
    guidance_cache: Mutex<Option<(String, Instant)>>,
}

impl FeedbackManager {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        warehouse: Arc<dyn Warehouse>,
        generator: Arc<dyn GeneratorAdapter>,
    ) -> Self {
        Self {
            object_store,
            warehouse,
            generator,
            guidance_cache: Mutex::new(None),
        }
    }

    /// Stores one feedback submission: audio (when present) and graph
    /// snapshot to the object store, then the row to the warehouse.
    pub async fn submit_feedback(
        &self,
        session_id: &str,
        rating: u8,
        comment: Option<&str>,
        graph: &SessionGraph,
        audio: Option<(&[u8], &str)>,
    ) -> Result<FeedbackUris, VoxgraphError> {
        let mut uris = FeedbackUris::default();

        if let Some((audio_bytes, codec)) = audio {
            let uri = self
                .object_store
                .upload_audio(session_id, audio_bytes, codec)
                .await?;
            uris.audio_uri = Some(uri);
        }

        let graph_uri = self.object_store.upload_graph(session_id, graph).await?;
        uris.graph_uri = Some(graph_uri.clone());

        let record = FeedbackRecord {
            session_id: session_id.to_string(),
            rating,
            comment: comment.unwrap_or_default().to_string(),
            graph_version: graph.version,
            entities_count: graph.entities.len(),
            relations_count: graph.relations.len(),
            audio_uri: uris.audio_uri.clone().unwrap_or_default(),
            graph_uri,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.warehouse.insert_feedback(&record).await?;

        // New feedback changes the guidance.
        *self.guidance_cache.lock().await = None;

        info!(
            session_id,
            rating,
            entities_count = record.entities_count,
            relations_count = record.relations_count,
            "feedback stored"
        );
        Ok(uris)
    }

    /// Guidance string derived from recent feedback, for the extraction
    /// prompt. Cached for five minutes; returns `None` when there is no
    /// feedback or the derivation fails.
    pub async fn improvement_context(&self) -> Option<String> {
        {
            let cache = self.guidance_cache.lock().await;
            if let Some((guidance, stamp)) = cache.as_ref() {
                if stamp.elapsed() < GUIDANCE_CACHE_TTL {
                    return if guidance.is_empty() {
                        None
                    } else {
                        Some(guidance.clone())
                    };
                }
            }
        }

        let guidance = match self.derive_guidance().await {
            Ok(guidance) => guidance,
            Err(e) => {
                warn!(error = %e, "improvement context derivation failed");
                return None;
            }
        };

        *self.guidance_cache.lock().await = Some((guidance.clone(), Instant::now()));
        if guidance.is_empty() {
            None
        } else {
            Some(guidance)
        }
    }

    async fn derive_guidance(&self) -> Result<String, VoxgraphError> {
        let mut rows = self.warehouse.recent_feedback(RECENT_FEEDBACK_LIMIT).await?;
        let low_rated = self.warehouse.low_rating_patterns().await?;
        rows.extend(low_rated);

        if rows.is_empty() {
            return Ok(String::new());
        }

        let lines: Vec<String> = rows
            .iter()
            .take(SUMMARIZED_FEEDBACK_LIMIT)
            .map(|r| format!("- Rating: {}/5, Comment: {}", r.rating, r.comment))
            .collect();

        let prompt = build_feedback_summary_prompt(&lines);
        let summary = self
            .generator
            .generate(&prompt, &GenerationConfig::summary())
            .await?;
        Ok(summary.trim().to_string())
    }

    /// Aggregate statistics for the analytics endpoint.
    pub async fn analytics(&self) -> Result<FeedbackAnalytics, VoxgraphError> {
        self.warehouse.feedback_analytics().await
    }

    /// Appends a session lifecycle event row; failures are logged, never fatal.
    pub async fn log_session_event(
        &self,
        session_id: &str,
        event_type: &str,
        event_data: serde_json::Value,
    ) {
        if let Err(e) = self
            .warehouse
            .insert_session_event(session_id, event_type, &event_data)
            .await
        {
            warn!(session_id, event_type, error = %e, "session event logging failed");
        }
    }

    /// Appends an extraction result row; failures are logged, never fatal.
    pub async fn log_extraction(&self, record: voxgraph_core::types::ExtractionRecord) {
        if let Err(e) = self.warehouse.insert_extraction_result(&record).await {
            warn!(session_id = record.session_id.as_str(), error = %e, "extraction logging failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgraph_test_utils::{MemoryObjectStore, MemoryWarehouse, MockGenerator};

    fn manager() -> (
        FeedbackManager,
        Arc<MemoryObjectStore>,
        Arc<MemoryWarehouse>,
        Arc<MockGenerator>,
    ) {
        let object_store = Arc::new(MemoryObjectStore::new());
        let warehouse = Arc::new(MemoryWarehouse::new());
        let generator = Arc::new(MockGenerator::new());
        let manager = FeedbackManager::new(
            object_store.clone(),
            warehouse.clone(),
            generator.clone(),
        );
        (manager, object_store, warehouse, generator)
    }

    #[tokio::test]
    async fn submit_uploads_artifacts_and_inserts_row() {
        let (manager, object_store, warehouse, _) = manager();
        let graph = SessionGraph::empty(0);

        let uris = manager
            .submit_feedback("s-1", 4, Some("useful"), &graph, Some((b"audio", "webm")))
            .await
            .unwrap();

        assert!(uris.audio_uri.is_some());
        assert!(uris.graph_uri.is_some());
        assert_eq!(object_store.upload_count(), 2);
        assert_eq!(warehouse.feedback_count(), 1);
    }

    #[tokio::test]
    async fn submit_without_audio_skips_audio_upload() {
        let (manager, object_store, _, _) = manager();
        let graph = SessionGraph::empty(0);

        let uris = manager
            .submit_feedback("s-1", 5, None, &graph, None)
            .await
            .unwrap();

        assert!(uris.audio_uri.is_none());
        assert!(uris.graph_uri.is_some());
        assert_eq!(object_store.upload_count(), 1);
    }

    #[tokio::test]
    async fn improvement_context_empty_without_feedback() {
        let (manager, _, _, _) = manager();
        assert!(manager.improvement_context().await.is_none());
    }

    #[tokio::test]
    async fn improvement_context_is_cached() {
        let (manager, _, _, generator) = manager();
        let graph = SessionGraph::empty(0);
        manager
            .submit_feedback("s-1", 2, Some("too many duplicates"), &graph, None)
            .await
            .unwrap();

        generator.push_response("Merge synonymous entities.").await;
        let first = manager.improvement_context().await;
        assert_eq!(first.as_deref(), Some("Merge synonymous entities."));

        // Second call hits the cache: the exhausted generator queue would
        // otherwise return the empty-extraction default.
        let second = manager.improvement_context().await;
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn new_feedback_invalidates_guidance_cache() {
        let (manager, _, _, generator) = manager();
        let graph = SessionGraph::empty(0);
        manager
            .submit_feedback("s-1", 2, Some("noisy"), &graph, None)
            .await
            .unwrap();

        generator.push_response("Guidance A").await;
        assert_eq!(
            manager.improvement_context().await.as_deref(),
            Some("Guidance A")
        );

        manager
            .submit_feedback("s-2", 1, Some("wrong labels"), &graph, None)
            .await
            .unwrap();
        generator.push_response("Guidance B").await;
        assert_eq!(
            manager.improvement_context().await.as_deref(),
            Some("Guidance B")
        );
    }
}
