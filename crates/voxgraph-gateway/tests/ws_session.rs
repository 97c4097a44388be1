// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-session tests over a real WebSocket connection, with every external
//! service mocked.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use voxgraph_core::types::{MessageKind, WsEnvelope};
use voxgraph_feedback::FeedbackManager;
use voxgraph_gateway::{build_router, AppContext};
use voxgraph_graph::GraphManager;
use voxgraph_llm::KnowledgeExtractor;
use voxgraph_pipeline::PipelineOptions;
use voxgraph_test_utils::{
    MemoryGraphStore, MemoryObjectStore, MemoryWarehouse, MockGenerator, MockSpeech,
};

struct TestServer {
    addr: std::net::SocketAddr,
    store: Arc<MemoryGraphStore>,
    warehouse: Arc<MemoryWarehouse>,
    generator: Arc<MockGenerator>,
}

async fn spawn_server(speech: MockSpeech) -> TestServer {
    let store = Arc::new(MemoryGraphStore::new());
    let warehouse = Arc::new(MemoryWarehouse::new());
    let object_store = Arc::new(MemoryObjectStore::new());
    let generator = Arc::new(MockGenerator::new());

    let feedback = Arc::new(FeedbackManager::new(
        object_store,
        warehouse.clone(),
        generator.clone(),
    ));

    let ctx = AppContext {
        graph: Arc::new(GraphManager::new(store.clone())),
        store: store.clone(),
        speech: Arc::new(speech),
        generator: generator.clone(),
        extractor: Arc::new(KnowledgeExtractor::new(generator.clone())),
        feedback: Some(feedback),
        pipeline_options: PipelineOptions::default(),
        extraction_limit: Arc::new(tokio::sync::Semaphore::new(3)),
        sessions: Arc::new(dashmap::DashMap::new()),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        addr,
        store,
        warehouse,
        generator,
    }
}

fn client_frame(kind: &str, payload: serde_json::Value) -> Message {
    Message::Text(
        serde_json::json!({
            "type": kind,
            "payload": payload,
            "timestamp": 1_700_000_000_000u64,
            "messageId": uuid::Uuid::new_v4().to_string(),
        })
        .to_string()
        .into(),
    )
}

fn audio_frame(sequence: u64) -> Message {
    client_frame(
        "AUDIO_CHUNK",
        serde_json::json!({
            "data": base64::engine::general_purpose::STANDARD.encode([0u8; 320]),
            "format": {"codec": "pcm", "sampleRate": 16000, "channels": 1},
            "sequenceNumber": sequence,
            "startTime": 0.0,
            "duration": 1000,
        }),
    )
}

/// Receives envelopes until `stop` matches one, or the deadline passes.
async fn collect_until(
    ws: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
          + Unpin),
    stop: impl Fn(&WsEnvelope) -> bool,
    deadline: Duration,
) -> Vec<WsEnvelope> {
    let mut envelopes = Vec::new();
    let result = tokio::time::timeout(deadline, async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                if let Ok(envelope) = serde_json::from_str::<WsEnvelope>(&text) {
                    let done = stop(&envelope);
                    envelopes.push(envelope);
                    if done {
                        return;
                    }
                }
            }
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for frame; got {envelopes:?}");
    envelopes
}

#[tokio::test]
async fn full_session_lifecycle() {
    let speech = MockSpeech::with_transcripts(vec![
        ("김철수는 삼성전자에서 일합니다.", Some("ko-KR")),
        ("회사는 수원에 있습니다.", Some("ko-KR")),
        ("내일 발표가 있습니다.", Some("ko-KR")),
    ]);
    let server = spawn_server(speech).await;

    server
        .generator
        .push_chunks(vec![
            "```json\n{ \"entities\": [ { \"id\": \"e1\", \"label\": \"김철수\", \"type\": \"PERSON\" }, { \"id\": \"e2\", \"label\": \"삼성전자\", \"type\": \"ORGANIZATION\" } ],",
            " \"relations\": [ { \"source\": \"e1\", \"target\": \"e2\", \"relation\": \"직장\" } ] }\n```",
        ])
        .await;

    let url = format!("ws://{}/ws", server.addr);
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

    // Frames before the start frame are refused without a response.
    ws.send(audio_frame(0)).await.unwrap();

    ws.send(client_frame(
        "START_SESSION",
        serde_json::json!({
            "sessionId": "client-session",
            "config": {"languageCodes": ["ko-KR"]}
        }),
    ))
    .await
    .unwrap();

    // The full graph is the first outbound frame.
    let envelopes = collect_until(
        &mut ws,
        |e| e.kind == MessageKind::GraphFull,
        Duration::from_secs(5),
    )
    .await;
    assert_eq!(envelopes.len(), 1, "GRAPH_FULL must be first, got {envelopes:?}");
    assert_eq!(envelopes[0].payload["version"], 0);

    // Ping gets an immediate pong.
    ws.send(client_frame("PING", serde_json::json!({}))).await.unwrap();
    collect_until(
        &mut ws,
        |e| e.kind == MessageKind::Pong,
        Duration::from_secs(5),
    )
    .await;

    // Three audio chunks produce three finals and, once batched, deltas.
    for i in 0..3 {
        ws.send(audio_frame(i)).await.unwrap();
    }

    let envelopes = collect_until(
        &mut ws,
        |e| {
            e.kind == MessageKind::GraphDelta
                && e.payload["addedRelations"]
                    .as_array()
                    .map(|relations| !relations.is_empty())
                    .unwrap_or(false)
        },
        Duration::from_secs(15),
    )
    .await;

    let partials = envelopes.iter().filter(|e| e.kind == MessageKind::SttPartial).count();
    let finals = envelopes.iter().filter(|e| e.kind == MessageKind::SttFinal).count();
    assert_eq!(partials, 3);
    assert_eq!(finals, 3);

    // Partials precede the deltas produced from their batch.
    let first_delta = envelopes
        .iter()
        .position(|e| e.kind == MessageKind::GraphDelta)
        .unwrap();
    let last_final = envelopes
        .iter()
        .rposition(|e| e.kind == MessageKind::SttFinal)
        .unwrap();
    assert!(last_final < first_delta);

    // Mid-session feedback is stored and acknowledged.
    ws.send(client_frame(
        "SUBMIT_FEEDBACK",
        serde_json::json!({"rating": 5, "comment": "great"}),
    ))
    .await
    .unwrap();
    let envelopes = collect_until(
        &mut ws,
        |e| e.kind == MessageKind::FeedbackResult,
        Duration::from_secs(5),
    )
    .await;
    let result = envelopes.last().unwrap();
    assert_eq!(result.payload["success"], true);
    assert!(result.payload["graphUri"].as_str().is_some());
    assert_eq!(server.warehouse.feedback_count(), 1);

    // End with clearSession: feedback request arrives, then the connection
    // closes and persisted state is purged.
    assert!(server.store.has_graph("client-session"));
    ws.send(client_frame(
        "END_SESSION",
        serde_json::json!({"clearSession": true}),
    ))
    .await
    .unwrap();
    collect_until(
        &mut ws,
        |e| e.kind == MessageKind::RequestFeedback,
        Duration::from_secs(5),
    )
    .await;

    // Wait for teardown to run.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!server.store.has_graph("client-session"));
    assert!(server.warehouse.event_count() >= 1, "session_start event expected");
}

#[tokio::test]
async fn management_surface_reports_state() {
    let server = spawn_server(MockSpeech::new()).await;
    let base = format!("http://{}", server.addr);
    let http = reqwest::Client::new();

    let identity: serde_json::Value =
        http.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(identity["name"], "voxgraph");

    let health: serde_json::Value = http
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert!(health["components"].as_array().unwrap().len() >= 3);

    let graph: serde_json::Value = http
        .get(format!("{base}/api/graph/some-session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graph["version"], 0);
    assert!(graph["entities"].as_array().unwrap().is_empty());

    let status = http
        .delete(format!("{base}/api/graph/some-session"))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::NO_CONTENT);

    let analytics: serde_json::Value = http
        .get(format!("{base}/api/feedback/analytics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analytics["totalFeedback"], 0);
}
