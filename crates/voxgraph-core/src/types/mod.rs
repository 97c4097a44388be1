// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Voxgraph server.

pub mod audio;
pub mod feedback;
pub mod graph;
pub mod protocol;

pub use audio::{AudioFormat, Transcript};
pub use feedback::{ExtractionRecord, FeedbackAnalytics, FeedbackRecord};
pub use graph::{
    EntityType, ExtractedEntity, ExtractedRelation, ExtractionResult, GraphDelta, GraphEntity,
    GraphRelation, SessionGraph,
};
pub use protocol::{
    AudioChunkPayload, EndSessionPayload, ErrorCode, ErrorPayload, FeedbackPayload,
    FeedbackResultPayload, MessageKind, ProcessingStage, ProcessingStatusPayload,
    RequestFeedbackPayload, SessionConfig, StartSessionPayload, SttFinalPayload,
    SttPartialPayload, TranslateGraphPayload, TranslateResultPayload, WsEnvelope,
};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}
