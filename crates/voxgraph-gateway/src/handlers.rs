// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the management surface.
//!
//! Handles `GET /`, `GET /health`, `GET /api/graph/{session}`,
//! `DELETE /api/graph/{session}`, and `GET /api/feedback/analytics`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use voxgraph_core::types::HealthStatus;
use voxgraph_core::ServiceAdapter;

use crate::state::AppContext;

/// Response body for `GET /`.
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    pub components: Vec<ComponentHealth>,
    pub active_sessions: usize,
}

/// Health of one external-service adapter.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /
pub async fn get_identity() -> Json<IdentityResponse> {
    Json(IdentityResponse {
        name: "voxgraph".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "real-time speech-to-knowledge-graph server".to_string(),
    })
}

/// GET /health
///
/// Reports per-component state; overall status is "degraded" when the cache
/// is unreachable.
pub async fn get_health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let cache = component_health(ctx.store.name(), ctx.store.health_check().await);
    let cache_healthy = cache.status == "healthy";

    let components = vec![
        cache,
        component_health(ctx.speech.name(), ctx.speech.health_check().await),
        component_health(ctx.generator.name(), ctx.generator.health_check().await),
    ];

    Json(HealthResponse {
        status: if cache_healthy { "ok" } else { "degraded" }.to_string(),
        components,
        active_sessions: ctx.sessions.len(),
    })
}

fn component_health(
    name: &str,
    result: Result<HealthStatus, voxgraph_core::VoxgraphError>,
) -> ComponentHealth {
    let health = result.unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
    let (status, detail) = match health {
        HealthStatus::Healthy => ("healthy", None),
        HealthStatus::Degraded(d) => ("degraded", Some(d)),
        HealthStatus::Unhealthy(d) => ("unhealthy", Some(d)),
    };
    ComponentHealth {
        name: name.to_string(),
        status: status.to_string(),
        detail,
    }
}

/// GET /api/graph/{session}
pub async fn get_graph(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Response {
    let graph = ctx.graph.get_state(&session_id).await;
    (StatusCode::OK, Json(graph)).into_response()
}

/// DELETE /api/graph/{session}
pub async fn delete_graph(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Response {
    ctx.graph.reset_state(&session_id).await;
    StatusCode::NO_CONTENT.into_response()
}

/// GET /api/feedback/analytics
pub async fn get_feedback_analytics(State(ctx): State<AppContext>) -> Response {
    let Some(feedback) = &ctx.feedback else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "feedback collection is disabled".to_string(),
            }),
        )
            .into_response();
    };

    match feedback.analytics().await {
        Ok(analytics) => (StatusCode::OK, Json(analytics)).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: format!("analytics query failed: {e}"),
            }),
        )
            .into_response(),
    }
}
