// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket session router.
//!
//! Accepts a connection, waits for the start frame, binds the pipeline
//! lifecycle, and routes inbound frames. Frames before the start frame are
//! refused; frames after the end frame close the connection.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use voxgraph_core::types::{
    AudioChunkPayload, EndSessionPayload, ErrorCode, ErrorPayload, FeedbackPayload,
    FeedbackResultPayload, MessageKind, RequestFeedbackPayload, StartSessionPayload,
    TranslateGraphPayload, TranslateResultPayload, WsEnvelope,
};
use voxgraph_core::{FrameSink, VoxgraphError};
use voxgraph_llm::translate_graph;
use voxgraph_pipeline::{Pipeline, SessionState};

use crate::state::AppContext;

/// Tick for observing heartbeat-driven deactivation while the receive side
/// is idle.
const INACTIVITY_POLL: Duration = Duration::from_secs(1);

/// [`FrameSink`] over the write half of an axum WebSocket.
///
/// The mutex provides the transport-level write exclusivity that direct
/// PING/PONG writes rely on.
pub struct WsFrameSink {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait::async_trait]
impl FrameSink for WsFrameSink {
    async fn send_frame(&self, frame: String) -> Result<(), VoxgraphError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| VoxgraphError::Transport {
                message: format!("websocket send failed: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, ctx))
}

/// Handles one connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let (ws_sink, ws_receiver) = socket.split();
    let sink = Arc::new(WsFrameSink {
        sink: Mutex::new(ws_sink),
    });

    let connection_id = uuid::Uuid::new_v4().to_string();
    let session = Arc::new(SessionState::new(connection_id.clone()));
    ctx.sessions.insert(connection_id.clone(), session.clone());

    info!(connection_id = connection_id.as_str(), "websocket connected");

    let pipeline = receive_loop(&ctx, &session, &sink, ws_receiver).await;

    // Teardown: stop workers, purge persisted state iff requested, drop the
    // in-memory graph entry, remove the session.
    session.deactivate();
    if let Some(pipeline) = &pipeline {
        pipeline.stop().await;
    }

    let session_id = session.session_id();
    if session.should_clear_on_close() {
        match ctx.store.clear_session(&session_id).await {
            Ok(()) => info!(session_id = session_id.as_str(), "session data cleared"),
            Err(e) => warn!(session_id = session_id.as_str(), error = %e, "session purge failed"),
        }
    }
    ctx.graph.evict(&session_id);
    ctx.sessions.remove(&connection_id);
    info!(session_id = session_id.as_str(), "websocket disconnected");
}

/// Receives frames until disconnect or deactivation. Returns the pipeline if
/// a session was started.
async fn receive_loop(
    ctx: &AppContext,
    session: &Arc<SessionState>,
    sink: &Arc<WsFrameSink>,
    mut ws_receiver: SplitStream<WebSocket>,
) -> Option<Arc<Pipeline>> {
    let mut pipeline: Option<Arc<Pipeline>> = None;

    loop {
        let msg = tokio::select! {
            msg = ws_receiver.next() => msg,
            _ = tokio::time::sleep(INACTIVITY_POLL) => {
                if session.is_active() {
                    continue;
                }
                // Heartbeat timeout or end frame: close the connection.
                break;
            }
        };

        let Some(msg) = msg else {
            break;
        };
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "websocket receive error");
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let envelope: WsEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "unparseable frame ignored");
                continue;
            }
        };

        match pipeline.clone() {
            None => {
                if envelope.kind == MessageKind::StartSession {
                    pipeline = Some(start_session(ctx, session, sink, envelope.payload).await);
                } else {
                    warn!(kind = %envelope.kind, "frame before session start refused");
                }
            }
            Some(active_pipeline) => {
                if !session.is_active() {
                    break;
                }
                session.touch_activity();
                handle_frame(ctx, session, &active_pipeline, sink, envelope).await;
            }
        }
    }

    pipeline
}

/// Processes the start frame: session rebinding, config, initial graph
/// state, and pipeline launch.
async fn start_session(
    ctx: &AppContext,
    session: &Arc<SessionState>,
    sink: &Arc<WsFrameSink>,
    payload: serde_json::Value,
) -> Arc<Pipeline> {
    let payload: StartSessionPayload = serde_json::from_value(payload).unwrap_or_default();

    if let Some(client_session_id) = payload.session_id {
        info!(
            client_session_id = client_session_id.as_str(),
            "session id restored from client"
        );
        session.rebind(&client_session_id);
    }
    if let Some(config) = payload.config {
        if let Some(codes) = config.language_codes {
            session.set_language_codes(codes);
        }
        if let Some(format) = config.audio_format {
            session.set_audio_format(format);
        }
    }

    let session_id = session.session_id();

    if let Some(feedback) = &ctx.feedback {
        feedback
            .log_session_event(
                &session_id,
                "session_start",
                serde_json::json!({ "timestamp": chrono::Utc::now().to_rfc3339() }),
            )
            .await;
    }

    // The full graph (possibly restored from the cache) is the first
    // outbound frame.
    let graph = ctx.graph.get_state(&session_id).await;
    send_direct(sink, MessageKind::GraphFull, serde_json::to_value(&graph).ok()).await;

    let pipeline = Arc::new(Pipeline::start(
        session.clone(),
        sink.clone(),
        ctx.pipeline_services(),
        ctx.pipeline_options.clone(),
    ));

    info!(session_id = session_id.as_str(), "session started");
    pipeline
}

/// Routes one post-start inbound frame by kind.
async fn handle_frame(
    ctx: &AppContext,
    session: &Arc<SessionState>,
    pipeline: &Arc<Pipeline>,
    sink: &Arc<WsFrameSink>,
    envelope: WsEnvelope,
) {
    match envelope.kind {
        MessageKind::AudioChunk => {
            let payload: AudioChunkPayload = match serde_json::from_value(envelope.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "malformed audio chunk");
                    send_error(
                        sink,
                        ErrorCode::AudioFormatUnsupported,
                        "audio chunk payload not understood",
                        true,
                    )
                    .await;
                    return;
                }
            };
            // Enqueueing may wait up to the queue's bound; keep the router
            // responsive by handing it off.
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline.process_audio_chunk(payload).await;
            });
        }

        MessageKind::StartSession => {
            debug!("duplicate start frame ignored");
        }

        MessageKind::EndSession => {
            let payload: EndSessionPayload =
                serde_json::from_value(envelope.payload).unwrap_or_default();
            session.mark_clear_on_close(payload.clear_session);
            handle_end_session(ctx, session, sink).await;
        }

        MessageKind::SubmitFeedback => {
            handle_feedback(ctx, session, sink, envelope.payload).await;
        }

        MessageKind::TranslateGraph => {
            handle_translate(ctx, session, sink, envelope.payload).await;
        }

        MessageKind::Ping => {
            send_direct(sink, MessageKind::Pong, Some(serde_json::json!({}))).await;
        }

        other => {
            warn!(kind = %other, "unexpected frame kind ignored");
        }
    }
}

/// End frame: deactivate and, with feedback enabled, ask for a rating.
async fn handle_end_session(
    ctx: &AppContext,
    session: &Arc<SessionState>,
    sink: &Arc<WsFrameSink>,
) {
    session.deactivate();
    let session_id = session.session_id();
    info!(session_id = session_id.as_str(), "session ended");

    if ctx.feedback.is_some() {
        let graph = ctx.graph.get_state(&session_id).await;
        let payload = RequestFeedbackPayload {
            session_id: session_id.clone(),
            entities_count: graph.entities.len(),
            relations_count: graph.relations.len(),
            duration_seconds: session.session_duration_seconds(),
        };
        send_direct(
            sink,
            MessageKind::RequestFeedback,
            serde_json::to_value(&payload).ok(),
        )
        .await;
    }
}

/// Feedback frame: upload artifacts, insert the row, answer with the result.
async fn handle_feedback(
    ctx: &AppContext,
    session: &Arc<SessionState>,
    sink: &Arc<WsFrameSink>,
    payload: serde_json::Value,
) {
    let result = submit_feedback(ctx, session, payload).await;
    let payload = match result {
        Ok((audio_uri, graph_uri)) => FeedbackResultPayload {
            success: true,
            message: "feedback stored, thank you".to_string(),
            audio_uri,
            graph_uri,
        },
        Err(message) => FeedbackResultPayload {
            success: false,
            message,
            audio_uri: None,
            graph_uri: None,
        },
    };
    send_direct(
        sink,
        MessageKind::FeedbackResult,
        serde_json::to_value(&payload).ok(),
    )
    .await;
}

async fn submit_feedback(
    ctx: &AppContext,
    session: &Arc<SessionState>,
    payload: serde_json::Value,
) -> Result<(Option<String>, Option<String>), String> {
    let Some(feedback) = &ctx.feedback else {
        return Err("feedback collection is disabled".to_string());
    };

    let payload: FeedbackPayload = serde_json::from_value(payload)
        .map_err(|e| format!("feedback payload not understood: {e}"))?;
    if !(1..=5).contains(&payload.rating) {
        return Err("rating must be between 1 and 5".to_string());
    }

    let session_id = session.session_id();
    let graph = ctx.graph.get_state(&session_id).await;
    let audio = session.accumulated_audio();
    let codec = session.audio_codec();

    let uris = feedback
        .submit_feedback(
            &session_id,
            payload.rating,
            payload.comment.as_deref(),
            &graph,
            audio.as_deref().map(|bytes| (bytes, codec.as_str())),
        )
        .await
        .map_err(|e| format!("feedback storage failed: {e}"))?;

    Ok((uris.audio_uri, uris.graph_uri))
}

/// Translate frame: run all labels through the generator.
async fn handle_translate(
    ctx: &AppContext,
    session: &Arc<SessionState>,
    sink: &Arc<WsFrameSink>,
    payload: serde_json::Value,
) {
    let target_language = serde_json::from_value::<TranslateGraphPayload>(payload)
        .map(|p| p.target_language)
        .unwrap_or_else(|_| "en".to_string());

    let session_id = session.session_id();
    let graph = ctx.graph.get_state(&session_id).await;

    let payload = if graph.entities.is_empty() {
        TranslateResultPayload {
            success: false,
            target_language: None,
            entities: Vec::new(),
            relations: Vec::new(),
            message: Some("no graph to translate".to_string()),
        }
    } else {
        match translate_graph(
            &ctx.generator,
            &graph.entities,
            &graph.relations,
            &target_language,
        )
        .await
        {
            Ok((entities, relations)) => {
                info!(
                    session_id = session_id.as_str(),
                    target_language = target_language.as_str(),
                    entities = entities.len(),
                    "graph translated"
                );
                TranslateResultPayload {
                    success: true,
                    target_language: Some(target_language),
                    entities,
                    relations,
                    message: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "graph translation failed");
                TranslateResultPayload {
                    success: false,
                    target_language: Some(target_language),
                    entities: Vec::new(),
                    relations: Vec::new(),
                    message: Some(format!("translation failed: {e}")),
                }
            }
        }
    };

    send_direct(
        sink,
        MessageKind::TranslateResult,
        serde_json::to_value(&payload).ok(),
    )
    .await;
}

/// Router-originated direct write, bypassing the pipeline queue.
async fn send_direct(
    sink: &Arc<WsFrameSink>,
    kind: MessageKind,
    payload: Option<serde_json::Value>,
) {
    let Some(payload) = payload else {
        return;
    };
    let envelope = WsEnvelope::new(kind, payload, chrono::Utc::now().timestamp_millis());
    match serde_json::to_string(&envelope) {
        Ok(frame) => {
            if let Err(e) = sink.send_frame(frame).await {
                warn!(kind = %kind, error = %e, "direct send failed");
            }
        }
        Err(e) => {
            warn!(kind = %kind, error = %e, "frame serialization failed");
        }
    }
}

async fn send_error(sink: &Arc<WsFrameSink>, code: ErrorCode, message: &str, recoverable: bool) {
    let payload = ErrorPayload {
        code,
        message: message.to_string(),
        recoverable,
        details: None,
    };
    send_direct(sink, MessageKind::Error, serde_json::to_value(&payload).ok()).await;
}
