// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the recognizer REST API.

use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/recognize`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeRequest {
    /// Base-64 encoded audio bytes.
    pub audio: String,
    pub config: RecognitionConfig,
    pub segment_id: String,
}

/// Decoding and recognition parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    /// Wire encoding name: LINEAR16, WEBM_OPUS, MP3, FLAC.
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub audio_channel_count: u16,
    /// BCP-47 hints, or `["auto"]` for automatic detection.
    pub language_codes: Vec<String>,
    pub enable_automatic_punctuation: bool,
}

/// Response body for `POST /v1/recognize`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

/// One recognized span; the first alternative is the best.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
    #[serde(default)]
    pub language_code: Option<String>,
}

/// A transcript hypothesis.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionAlternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_with_missing_fields_deserializes() {
        let response: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());

        let response: RecognizeResponse = serde_json::from_str(
            r#"{"results": [{"alternatives": [{"transcript": "hello"}]}]}"#,
        )
        .unwrap();
        assert_eq!(response.results[0].alternatives[0].transcript, "hello");
        assert_eq!(response.results[0].alternatives[0].confidence, 0.0);
        assert!(response.results[0].language_code.is_none());
    }
}
