// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket wire protocol: message envelope, kinds, and payloads.
//!
//! Every frame on the wire is a JSON object:
//! ```json
//! { "type": "AUDIO_CHUNK", "payload": { ... }, "timestamp": 1700000000000, "messageId": "uuid" }
//! ```

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::types::audio::AudioFormat;
use crate::types::graph::{GraphEntity, GraphRelation};

/// Frame kinds in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    // Client -> server
    StartSession,
    AudioChunk,
    EndSession,
    SubmitFeedback,
    TranslateGraph,
    Ping,
    // Server -> client
    SttPartial,
    SttFinal,
    GraphFull,
    GraphDelta,
    ProcessingStatus,
    Error,
    Pong,
    RequestFeedback,
    FeedbackResult,
    TranslateResult,
}

impl MessageKind {
    /// Urgent kinds bypass the outbound queue and are written directly.
    pub fn is_urgent(self) -> bool {
        matches!(self, MessageKind::Ping | MessageKind::Pong)
    }
}

/// The JSON envelope wrapping every frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEnvelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub message_id: String,
}

impl WsEnvelope {
    /// Wrap a payload in a fresh envelope with a new message id.
    pub fn new(kind: MessageKind, payload: serde_json::Value, now_ms: i64) -> Self {
        Self {
            kind,
            payload,
            timestamp: now_ms,
            message_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// `START_SESSION` payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionPayload {
    /// Client-supplied session id to resume an existing session.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub config: Option<SessionConfig>,
}

/// Optional session configuration carried in the start frame.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub audio_format: Option<AudioFormat>,
    /// BCP-47 language hints for the recognizer ("auto" when absent).
    #[serde(default)]
    pub language_codes: Option<Vec<String>>,
    #[serde(default)]
    pub extraction_mode: Option<String>,
}

/// `AUDIO_CHUNK` payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunkPayload {
    /// Base-64 encoded audio bytes.
    pub data: String,
    pub format: AudioFormat,
    pub sequence_number: u64,
    #[serde(default)]
    pub start_time: Option<f64>,
    /// Chunk duration in milliseconds.
    pub duration: u64,
}

/// `END_SESSION` payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionPayload {
    /// When set, persisted session state is purged on close.
    #[serde(default)]
    pub clear_session: bool,
}

/// `SUBMIT_FEEDBACK` payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    /// Satisfaction rating, 1-5.
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// `TRANSLATE_GRAPH` payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateGraphPayload {
    pub target_language: String,
}

/// `STT_PARTIAL` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SttPartialPayload {
    pub text: String,
    pub confidence: f64,
    pub segment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// `STT_FINAL` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SttFinalPayload {
    pub text: String,
    pub confidence: f64,
    pub segment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morphemes: Option<Vec<String>>,
    pub is_complete: bool,
}

/// Pipeline stage reported in `PROCESSING_STATUS` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStage {
    Receiving,
    SttProcessing,
    NlpAnalyzing,
    Extracting,
    UpdatingGraph,
    SavingData,
    Idle,
}

/// `PROCESSING_STATUS` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatusPayload {
    pub stage: ProcessingStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
}

/// Error codes carried in `ERROR` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AudioFormatUnsupported,
    SttFailed,
    ExtractionFailed,
    GraphUpdateFailed,
    RateLimited,
    SessionExpired,
    FeedbackFailed,
    StorageError,
    InternalError,
}

/// `ERROR` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    /// Whether the client may retry the failed operation.
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// `REQUEST_FEEDBACK` payload, sent when a session ends with feedback enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFeedbackPayload {
    pub session_id: String,
    pub entities_count: usize,
    pub relations_count: usize,
    pub duration_seconds: u64,
}

/// `FEEDBACK_RESULT` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResultPayload {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_uri: Option<String>,
}

/// `TRANSLATE_RESULT` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResultPayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    pub entities: Vec<GraphEntity>,
    pub relations: Vec<GraphRelation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&MessageKind::StartSession).unwrap(),
            "\"START_SESSION\""
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::SttPartial).unwrap(),
            "\"STT_PARTIAL\""
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::GraphDelta).unwrap(),
            "\"GRAPH_DELTA\""
        );
    }

    #[test]
    fn only_ping_pong_are_urgent() {
        assert!(MessageKind::Ping.is_urgent());
        assert!(MessageKind::Pong.is_urgent());
        assert!(!MessageKind::GraphDelta.is_urgent());
        assert!(!MessageKind::SttFinal.is_urgent());
    }

    #[test]
    fn envelope_round_trips() {
        let env = WsEnvelope::new(
            MessageKind::Pong,
            serde_json::json!({}),
            1_700_000_000_000,
        );
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"type\":\"PONG\""));
        assert!(json.contains("\"messageId\""));
        let parsed: WsEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind, MessageKind::Pong);
        assert_eq!(parsed.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn start_session_payload_all_fields_optional() {
        let payload: StartSessionPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.session_id.is_none());
        assert!(payload.config.is_none());

        let payload: StartSessionPayload = serde_json::from_str(
            r#"{"sessionId": "s-1", "config": {"languageCodes": ["ko-KR", "en-US"]}}"#,
        )
        .unwrap();
        assert_eq!(payload.session_id.as_deref(), Some("s-1"));
        assert_eq!(
            payload.config.unwrap().language_codes.unwrap(),
            vec!["ko-KR", "en-US"]
        );
    }

    #[test]
    fn end_session_clear_flag_defaults_false() {
        let payload: EndSessionPayload = serde_json::from_str("{}").unwrap();
        assert!(!payload.clear_session);

        let payload: EndSessionPayload =
            serde_json::from_str(r#"{"clearSession": true}"#).unwrap();
        assert!(payload.clear_session);
    }

    #[test]
    fn processing_stage_wire_names() {
        assert_eq!(
            serde_json::to_string(&ProcessingStage::SttProcessing).unwrap(),
            "\"STT_PROCESSING\""
        );
        assert_eq!(
            serde_json::to_string(&ProcessingStage::Idle).unwrap(),
            "\"IDLE\""
        );
    }

    #[test]
    fn error_payload_serializes_code() {
        let payload = ErrorPayload {
            code: ErrorCode::SttFailed,
            message: "recognizer unavailable".into(),
            recoverable: true,
            details: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["code"], "STT_FAILED");
        assert_eq!(json["recoverable"], true);
    }
}
