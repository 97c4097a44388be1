// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared application state handed to every connection.
//!
//! External-service clients are process-wide singletons constructed once at
//! startup and passed by handle to each new connection.

use std::sync::Arc;

use dashmap::DashMap;

use voxgraph_core::{GeneratorAdapter, GraphStore, SpeechAdapter};
use voxgraph_feedback::FeedbackManager;
use voxgraph_graph::GraphManager;
use voxgraph_llm::KnowledgeExtractor;
use voxgraph_pipeline::{PipelineOptions, PipelineServices, SessionState};

/// Process-wide context shared by HTTP handlers and WebSocket sessions.
#[derive(Clone)]
pub struct AppContext {
    pub graph: Arc<GraphManager>,
    pub store: Arc<dyn GraphStore>,
    pub speech: Arc<dyn SpeechAdapter>,
    pub generator: Arc<dyn GeneratorAdapter>,
    pub extractor: Arc<KnowledgeExtractor>,
    /// `None` disables the feedback workflow entirely.
    pub feedback: Option<Arc<FeedbackManager>>,
    pub pipeline_options: PipelineOptions,
    /// Process-wide cap on concurrent extraction calls.
    pub extraction_limit: Arc<tokio::sync::Semaphore>,
    /// Active sessions by connection id, for observability and cleanup.
    pub sessions: Arc<DashMap<String, Arc<SessionState>>>,
}

impl AppContext {
    /// The service bundle a new pipeline needs.
    pub fn pipeline_services(&self) -> PipelineServices {
        PipelineServices {
            speech: self.speech.clone(),
            extractor: self.extractor.clone(),
            graph: self.graph.clone(),
            feedback: self.feedback.clone(),
            extraction_limit: self.extraction_limit.clone(),
        }
    }
}
