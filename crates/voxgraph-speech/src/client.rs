// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the speech recognizer service.
//!
//! Maps one audio segment to at most one transcript. Transient HTTP errors
//! (429, 500, 503) are retried with backoff up to three attempts; anything
//! else surfaces as a speech error that the STT worker absorbs.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, warn};

use voxgraph_core::types::{AudioFormat, HealthStatus, Transcript};
use voxgraph_core::{ServiceAdapter, SpeechAdapter, VoxgraphError};

use crate::types::{RecognitionConfig, RecognizeRequest, RecognizeResponse};

/// Total attempts for one segment, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// HTTP client for the recognizer REST API.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    base_url: String,
}

impl SpeechClient {
    /// Creates a recognizer client for the given endpoint.
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self, VoxgraphError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(key).map_err(|e| {
                    VoxgraphError::Config(format!("invalid speech API key: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoxgraphError::Speech {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Maps a codec name to the recognizer's wire encoding.
    fn encoding_for(format: &AudioFormat) -> &'static str {
        match format.codec.as_str() {
            "pcm" | "wav" => "LINEAR16",
            "webm" | "opus" => "WEBM_OPUS",
            "mp3" => "MP3",
            "flac" => "FLAC",
            _ => "LINEAR16",
        }
    }
}

#[async_trait]
impl ServiceAdapter for SpeechClient {
    fn name(&self) -> &str {
        "speech-client"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        let url = format!("{}/v1/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "recognizer returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("recognizer unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl SpeechAdapter for SpeechClient {
    async fn transcribe_chunk(
        &self,
        audio: &[u8],
        format: &AudioFormat,
        segment_id: &str,
        language_codes: &[String],
    ) -> Result<Option<Transcript>, VoxgraphError> {
        let request = RecognizeRequest {
            audio: base64::engine::general_purpose::STANDARD.encode(audio),
            config: RecognitionConfig {
                encoding: Self::encoding_for(format).to_string(),
                sample_rate_hertz: format.sample_rate,
                audio_channel_count: format.channels,
                language_codes: language_codes.to_vec(),
                enable_automatic_punctuation: true,
            },
            segment_id: segment_id.to_string(),
        };

        let url = format!("{}/v1/recognize", self.base_url);
        let mut last_error: Option<VoxgraphError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt - 1);
                warn!(segment_id, attempt, "retrying recognizer request");
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(&request).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(VoxgraphError::Speech {
                        message: format!("recognizer request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let body: RecognizeResponse =
                    response.json().await.map_err(|e| VoxgraphError::Speech {
                        message: format!("recognizer response parse failed: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(best_transcript(&body, segment_id));
            }

            if is_transient(status) {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(VoxgraphError::Speech {
                    message: format!("recognizer returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(VoxgraphError::Speech {
                message: format!("recognizer returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| VoxgraphError::Speech {
            message: "recognizer request failed after retries".into(),
            source: None,
        }))
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
    )
}

/// Picks the best alternative from the first result, skipping empty text.
fn best_transcript(response: &RecognizeResponse, segment_id: &str) -> Option<Transcript> {
    let result = response.results.first()?;
    let alternative = result.alternatives.first()?;
    let text = alternative.transcript.trim();
    if text.is_empty() {
        return None;
    }
    debug!(
        segment_id,
        text_len = text.len(),
        language = result.language_code.as_deref().unwrap_or("unknown"),
        "transcript received"
    );
    Some(Transcript {
        text: text.to_string(),
        confidence: alternative.confidence,
        language_code: result.language_code.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pcm_format() -> AudioFormat {
        AudioFormat::default()
    }

    #[test]
    fn codec_encoding_mapping() {
        let mut format = AudioFormat::default();
        assert_eq!(SpeechClient::encoding_for(&format), "LINEAR16");
        format.codec = "webm".into();
        assert_eq!(SpeechClient::encoding_for(&format), "WEBM_OPUS");
        format.codec = "flac".into();
        assert_eq!(SpeechClient::encoding_for(&format), "FLAC");
        format.codec = "unknown".into();
        assert_eq!(SpeechClient::encoding_for(&format), "LINEAR16");
    }

    #[tokio::test]
    async fn transcribes_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/recognize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "alternatives": [{"transcript": " 김철수는 삼성전자에서 일한다. ", "confidence": 0.94}],
                    "languageCode": "ko-KR"
                }]
            })))
            .mount(&server)
            .await;

        let client = SpeechClient::new(&server.uri(), None).unwrap();
        let result = client
            .transcribe_chunk(b"audio", &pcm_format(), "s-1_0", &["auto".to_string()])
            .await
            .unwrap();

        let transcript = result.expect("transcript expected");
        assert_eq!(transcript.text, "김철수는 삼성전자에서 일한다.");
        assert_eq!(transcript.language_code.as_deref(), Some("ko-KR"));
    }

    #[tokio::test]
    async fn silent_segment_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/recognize"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})),
            )
            .mount(&server)
            .await;

        let client = SpeechClient::new(&server.uri(), None).unwrap();
        let result = client
            .transcribe_chunk(b"audio", &pcm_format(), "s-1_0", &["auto".to_string()])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn whitespace_transcript_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/recognize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"alternatives": [{"transcript": "   "}]}]
            })))
            .mount(&server)
            .await;

        let client = SpeechClient::new(&server.uri(), None).unwrap();
        let result = client
            .transcribe_chunk(b"audio", &pcm_format(), "s-1_0", &["auto".to_string()])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn transient_error_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/recognize"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/recognize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"alternatives": [{"transcript": "hello", "confidence": 0.8}]}]
            })))
            .mount(&server)
            .await;

        let client = SpeechClient::new(&server.uri(), None).unwrap();
        let result = client
            .transcribe_chunk(b"audio", &pcm_format(), "s-1_0", &["en-US".to_string()])
            .await
            .unwrap();
        assert_eq!(result.unwrap().text, "hello");
    }

    #[tokio::test]
    async fn non_transient_error_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/recognize"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad encoding"))
            .expect(1)
            .mount(&server)
            .await;

        let client = SpeechClient::new(&server.uri(), None).unwrap();
        let err = client
            .transcribe_chunk(b"audio", &pcm_format(), "s-1_0", &["auto".to_string()])
            .await
            .expect_err("400 must not retry");
        assert!(matches!(err, VoxgraphError::Speech { .. }));
    }
}
