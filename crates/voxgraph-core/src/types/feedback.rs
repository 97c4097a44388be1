// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback and analytics row types shared by the warehouse adapter and the
//! feedback manager.

use serde::{Deserialize, Serialize};

/// A user feedback row as stored in (and read back from) the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub session_id: String,
    /// Satisfaction rating, 1-5.
    pub rating: u8,
    pub comment: String,
    pub graph_version: u64,
    pub entities_count: usize,
    pub relations_count: usize,
    pub audio_uri: String,
    pub graph_uri: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Aggregate feedback statistics over the trailing 30 days.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAnalytics {
    pub total_feedback: u64,
    pub avg_rating: f64,
    /// Ratings >= 4.
    pub positive_count: u64,
    /// Ratings <= 2.
    pub negative_count: u64,
    pub avg_entities: f64,
    pub avg_relations: f64,
}

/// One extraction logged to the warehouse for offline analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub session_id: String,
    /// Input text, capped at 1000 characters by the writer.
    pub text_input: String,
    pub entities_count: usize,
    pub relations_count: usize,
    pub processing_time_ms: u64,
    pub entities_json: String,
    pub relations_json: String,
}
