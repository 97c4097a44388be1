// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ObjectStore`] and [`Warehouse`] for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use voxgraph_core::types::{
    ExtractionRecord, FeedbackAnalytics, FeedbackRecord, HealthStatus, SessionGraph,
};
use voxgraph_core::{ObjectStore, ServiceAdapter, VoxgraphError, Warehouse};

/// An [`ObjectStore`] that records uploads in memory.
#[derive(Default)]
pub struct MemoryObjectStore {
    pub uploads: Mutex<Vec<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl ServiceAdapter for MemoryObjectStore {
    fn name(&self) -> &str {
        "memory-object-store"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload_audio(
        &self,
        session_id: &str,
        _audio: &[u8],
        codec: &str,
    ) -> Result<String, VoxgraphError> {
        let uri = format!("store://test/audio/{session_id}.{codec}");
        self.uploads.lock().expect("lock poisoned").push(uri.clone());
        Ok(uri)
    }

    async fn upload_graph(
        &self,
        session_id: &str,
        graph: &SessionGraph,
    ) -> Result<String, VoxgraphError> {
        let uri = format!("store://test/graphs/{session_id}_v{}.json", graph.version);
        self.uploads.lock().expect("lock poisoned").push(uri.clone());
        Ok(uri)
    }

    async fn upload_session_log(
        &self,
        session_id: &str,
        _log: &serde_json::Value,
    ) -> Result<String, VoxgraphError> {
        let uri = format!("store://test/logs/{session_id}.json");
        self.uploads.lock().expect("lock poisoned").push(uri.clone());
        Ok(uri)
    }
}

/// A [`Warehouse`] that appends rows to in-memory vectors.
#[derive(Default)]
pub struct MemoryWarehouse {
    pub session_events: Mutex<Vec<(String, String)>>,
    pub extractions: Mutex<Vec<ExtractionRecord>>,
    pub feedback: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> usize {
        self.session_events.lock().expect("lock poisoned").len()
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl ServiceAdapter for MemoryWarehouse {
    fn name(&self) -> &str {
        "memory-warehouse"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn insert_session_event(
        &self,
        session_id: &str,
        event_type: &str,
        _event_data: &serde_json::Value,
    ) -> Result<(), VoxgraphError> {
        self.session_events
            .lock()
            .expect("lock poisoned")
            .push((session_id.to_string(), event_type.to_string()));
        Ok(())
    }

    async fn insert_extraction_result(
        &self,
        record: &ExtractionRecord,
    ) -> Result<(), VoxgraphError> {
        self.extractions
            .lock()
            .expect("lock poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn insert_feedback(&self, record: &FeedbackRecord) -> Result<(), VoxgraphError> {
        self.feedback
            .lock()
            .expect("lock poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn recent_feedback(
        &self,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, VoxgraphError> {
        let rows = self.feedback.lock().expect("lock poisoned");
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }

    async fn low_rating_patterns(&self) -> Result<Vec<FeedbackRecord>, VoxgraphError> {
        let rows = self.feedback.lock().expect("lock poisoned");
        Ok(rows
            .iter()
            .filter(|r| r.rating <= 2 && !r.comment.is_empty())
            .cloned()
            .collect())
    }

    async fn feedback_analytics(&self) -> Result<FeedbackAnalytics, VoxgraphError> {
        let rows = self.feedback.lock().expect("lock poisoned");
        let total = rows.len() as u64;
        let avg_rating = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.rating as f64).sum::<f64>() / rows.len() as f64
        };
        Ok(FeedbackAnalytics {
            total_feedback: total,
            avg_rating,
            positive_count: rows.iter().filter(|r| r.rating >= 4).count() as u64,
            negative_count: rows.iter().filter(|r| r.rating <= 2).count() as u64,
            avg_entities: 0.0,
            avg_relations: 0.0,
        })
    }
}
