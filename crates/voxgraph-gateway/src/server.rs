// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP/WebSocket server built on axum.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use voxgraph_core::VoxgraphError;

use crate::handlers;
use crate::state::AppContext;
use crate::ws;

/// Builds the gateway router.
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(handlers::get_identity))
        .route("/health", get(handlers::get_health))
        .route("/api/graph/{session_id}", get(handlers::get_graph))
        .route("/api/graph/{session_id}", delete(handlers::delete_graph))
        .route("/api/feedback/analytics", get(handlers::get_feedback_analytics))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Binds and serves the gateway until the process exits.
pub async fn start_server(host: &str, port: u16, ctx: AppContext) -> Result<(), VoxgraphError> {
    let app = build_router(ctx);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VoxgraphError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| VoxgraphError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
