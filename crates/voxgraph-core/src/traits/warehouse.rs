// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Warehouse adapter trait for append-only analytics rows.

use async_trait::async_trait;

use crate::error::VoxgraphError;
use crate::traits::adapter::ServiceAdapter;
use crate::types::{ExtractionRecord, FeedbackAnalytics, FeedbackRecord};

/// Adapter for the append-only event warehouse.
///
/// Three row families: session events, extraction results, and user
/// feedback. Reads serve the feedback-improvement loop and the analytics
/// endpoint.
#[async_trait]
pub trait Warehouse: ServiceAdapter {
    /// Appends a session lifecycle event.
    async fn insert_session_event(
        &self,
        session_id: &str,
        event_type: &str,
        event_data: &serde_json::Value,
    ) -> Result<(), VoxgraphError>;

    /// Appends one extraction's result row.
    async fn insert_extraction_result(
        &self,
        record: &ExtractionRecord,
    ) -> Result<(), VoxgraphError>;

    /// Appends a user feedback row.
    async fn insert_feedback(&self, record: &FeedbackRecord) -> Result<(), VoxgraphError>;

    /// Most recent feedback rows, newest first.
    async fn recent_feedback(
        &self,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, VoxgraphError>;

    /// Low-rated feedback rows with non-empty comments, for pattern analysis.
    async fn low_rating_patterns(&self) -> Result<Vec<FeedbackRecord>, VoxgraphError>;

    /// Aggregate statistics over the trailing 30 days.
    async fn feedback_analytics(&self) -> Result<FeedbackAnalytics, VoxgraphError>;
}
