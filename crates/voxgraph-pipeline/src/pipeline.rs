// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-connection streaming pipeline.
//!
//! Five concurrent workers per connection:
//! 1. STT: audio queue -> recognizer -> partial frames + text queue
//! 2. NLP: text queue -> sentence boundary detection -> final frames + sentence queue
//! 3. Extraction: sentence batches -> LLM streaming -> graph deltas
//! 4. Heartbeat: liveness probe, deactivates on client silence
//! 5. Outbound sender: drains the frame queue to the transport
//!
//! Cancellation is cooperative through the session's active flag; every
//! blocking wait is timeout-bounded so one tick observes the flag.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use voxgraph_core::types::{
    AudioChunkPayload, ExtractionRecord, ExtractionResult, GraphDelta, MessageKind,
    ProcessingStage, ProcessingStatusPayload, SttFinalPayload, SttPartialPayload,
};
use voxgraph_core::{FrameSink, SpeechAdapter};
use voxgraph_feedback::FeedbackManager;
use voxgraph_graph::{GraphManager, IdMap};
use voxgraph_llm::KnowledgeExtractor;

use crate::outbound::{Outbound, OutboundWorker};
use crate::queues::{
    send_bounded, AudioItem, TextItem, AUDIO_ENQUEUE_TIMEOUT, AUDIO_QUEUE_CAPACITY,
    SENTENCE_QUEUE_CAPACITY, TEXT_ENQUEUE_TIMEOUT, TEXT_QUEUE_CAPACITY,
};
use crate::sentence::{min_flush_length, split_complete_sentences};
use crate::session::SessionState;

/// Heartbeat tick.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Client silence beyond this closes the session.
const HEARTBEAT_TIMEOUT_SECS: u64 = 45;

/// Recognizer call timeout.
const STT_TIMEOUT: Duration = Duration::from_secs(30);

/// Consecutive recognizer failures before the long pause.
const STT_MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Queue poll tick shared by the worker loops.
const QUEUE_POLL: Duration = Duration::from_millis(500);

/// Buffer age that allows a force-flush.
const FORCE_FLUSH_TIMEOUT: Duration = Duration::from_millis(2500);

/// Seconds without an extraction that trigger one for a non-empty batch.
const EXTRACTION_MAX_WAIT: Duration = Duration::from_secs(5);

/// External services the pipeline drives.
#[derive(Clone)]
pub struct PipelineServices {
    pub speech: Arc<dyn SpeechAdapter>,
    pub extractor: Arc<KnowledgeExtractor>,
    pub graph: Arc<GraphManager>,
    /// `None` disables the feedback workflow and warehouse logging.
    pub feedback: Option<Arc<FeedbackManager>>,
    /// Process-wide cap on concurrent extraction calls, shared across
    /// connections.
    pub extraction_limit: Arc<tokio::sync::Semaphore>,
}

/// Pipeline tuning taken from configuration.
#[derive(Clone)]
pub struct PipelineOptions {
    pub extraction_batch_size: usize,
    pub default_language_codes: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            extraction_batch_size: 3,
            default_language_codes: vec!["auto".to_string()],
        }
    }
}

/// One running pipeline; owns the worker tasks for a single connection.
pub struct Pipeline {
    session: Arc<SessionState>,
    audio_tx: mpsc::Sender<AudioItem>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Pipeline {
    /// Starts the five workers for a session.
    pub fn start(
        session: Arc<SessionState>,
        sink: Arc<dyn FrameSink>,
        services: PipelineServices,
        options: PipelineOptions,
    ) -> Self {
        let (outbound, outbound_rx) = Outbound::new(sink, session.clone());
        let (audio_tx, audio_rx) = mpsc::channel::<AudioItem>(AUDIO_QUEUE_CAPACITY);
        let (text_tx, text_rx) = mpsc::channel::<TextItem>(TEXT_QUEUE_CAPACITY);
        let (sentence_tx, sentence_rx) = mpsc::channel::<String>(SENTENCE_QUEUE_CAPACITY);

        let tasks = vec![
            tokio::spawn(stt_worker(
                session.clone(),
                outbound.clone(),
                services.speech.clone(),
                options.default_language_codes.clone(),
                audio_rx,
                text_tx,
            )),
            tokio::spawn(nlp_worker(
                session.clone(),
                outbound.clone(),
                text_rx,
                sentence_tx,
            )),
            tokio::spawn(extraction_worker(
                session.clone(),
                outbound.clone(),
                services.clone(),
                options.extraction_batch_size,
                sentence_rx,
            )),
            tokio::spawn(heartbeat_worker(session.clone(), outbound.clone())),
            tokio::spawn(
                OutboundWorker::new(outbound.clone(), outbound_rx, session.clone()).run(),
            ),
        ];

        info!(
            session_id = session.session_id().as_str(),
            workers = tasks.len(),
            "pipeline started"
        );

        Self {
            session,
            audio_tx,
            tasks: std::sync::Mutex::new(tasks),
        }
    }

    /// Decodes and enqueues one audio chunk; drops it after a 500 ms wait
    /// when the queue stays full. Also feeds the session's feedback buffer.
    pub async fn process_audio_chunk(&self, payload: AudioChunkPayload) {
        let audio = match base64::engine::general_purpose::STANDARD.decode(&payload.data) {
            Ok(audio) => audio,
            Err(e) => {
                warn!(
                    sequence = payload.sequence_number,
                    error = %e,
                    "audio chunk decode failed"
                );
                return;
            }
        };

        debug!(
            size = audio.len(),
            sequence = payload.sequence_number,
            "audio chunk received"
        );

        self.session.set_audio_format(payload.format.clone());
        self.session.add_audio_chunk(audio.clone(), payload.duration);

        send_bounded(
            &self.audio_tx,
            (audio, payload.format),
            AUDIO_ENQUEUE_TIMEOUT,
            "audio",
        )
        .await;
    }

    /// Deactivates the session and waits for the workers to wind down.
    /// Idempotent: later calls find no tasks left to join.
    pub async fn stop(&self) {
        self.session.deactivate();
        let tasks = std::mem::take(&mut *self.tasks.lock().expect("lock poisoned"));
        for task in tasks {
            if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
                warn!("worker did not stop within grace period");
            }
        }
        info!(
            session_id = self.session.session_id().as_str(),
            "pipeline stopped"
        );
    }
}

async fn send_status(outbound: &Outbound, stage: ProcessingStage) {
    let payload = ProcessingStatusPayload {
        stage,
        chunk_id: None,
    };
    let Ok(value) = serde_json::to_value(&payload) else {
        return;
    };
    outbound.send(MessageKind::ProcessingStatus, value).await;
}

async fn send_payload<T: serde::Serialize>(
    outbound: &Outbound,
    kind: MessageKind,
    payload: &T,
) -> bool {
    match serde_json::to_value(payload) {
        Ok(value) => outbound.send(kind, value).await,
        Err(e) => {
            error!(kind = %kind, error = %e, "payload serialization failed");
            false
        }
    }
}

// ============================================
// Worker 1: STT
// ============================================

async fn stt_worker(
    session: Arc<SessionState>,
    outbound: Arc<Outbound>,
    speech: Arc<dyn SpeechAdapter>,
    default_languages: Vec<String>,
    mut audio_rx: mpsc::Receiver<AudioItem>,
    text_tx: mpsc::Sender<TextItem>,
) {
    info!("stt worker started");
    let language_codes = session.language_codes().unwrap_or(default_languages);
    let mut consecutive_errors: u32 = 0;

    while session.is_active() {
        let (audio, format) = match tokio::time::timeout(QUEUE_POLL, audio_rx.recv()).await {
            Err(_) => continue,
            Ok(None) => break,
            Ok(Some(item)) => item,
        };

        send_status(&outbound, ProcessingStage::SttProcessing).await;

        let segment_id = format!("{}_{}", session.session_id(), session.next_sequence());

        let result = tokio::time::timeout(
            STT_TIMEOUT,
            speech.transcribe_chunk(&audio, &format, &segment_id, &language_codes),
        )
        .await;

        match result {
            Err(_) => {
                warn!(segment_id = segment_id.as_str(), "recognizer timed out");
                consecutive_errors += 1;
            }
            Ok(Err(e)) => {
                error!(
                    segment_id = segment_id.as_str(),
                    error = %e,
                    consecutive_errors,
                    "recognizer error"
                );
                consecutive_errors += 1;
                if consecutive_errors >= STT_MAX_CONSECUTIVE_ERRORS {
                    warn!(consecutive_errors, "too many recognizer errors, backing off");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    consecutive_errors = 0;
                } else {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
            Ok(Ok(None)) => {}
            Ok(Ok(Some(transcript))) => {
                if !transcript.text.trim().is_empty() {
                    let sent = send_payload(
                        &outbound,
                        MessageKind::SttPartial,
                        &SttPartialPayload {
                            text: transcript.text.clone(),
                            confidence: transcript.confidence,
                            segment_id: segment_id.clone(),
                            language_code: transcript.language_code.clone(),
                        },
                    )
                    .await;

                    if sent {
                        send_bounded(
                            &text_tx,
                            (transcript.text, transcript.language_code),
                            TEXT_ENQUEUE_TIMEOUT,
                            "text",
                        )
                        .await;
                    }
                    consecutive_errors = 0;
                }
            }
        }

        send_status(&outbound, ProcessingStage::Idle).await;
    }

    info!("stt worker stopped");
}

// ============================================
// Worker 2: NLP
// ============================================

async fn nlp_worker(
    session: Arc<SessionState>,
    outbound: Arc<Outbound>,
    mut text_rx: mpsc::Receiver<TextItem>,
    sentence_tx: mpsc::Sender<String>,
) {
    info!("nlp worker started");

    let mut buffer = String::new();
    let mut sentence_counter: u64 = 0;
    let mut last_text_time = Instant::now();
    let mut current_language: Option<String> = None;
    let mut detected_languages: std::collections::HashMap<String, u32> =
        std::collections::HashMap::new();

    while session.is_active() {
        let item = tokio::time::timeout(QUEUE_POLL, text_rx.recv()).await;

        match item {
            Err(_) => {
                // No new text: consider a force-flush of the stale buffer.
                if buffer.is_empty() {
                    continue;
                }
                let stale = last_text_time.elapsed() >= FORCE_FLUSH_TIMEOUT;
                let min_length = min_flush_length(current_language.as_deref());
                let long_enough = buffer.chars().count() >= min_length
                    || buffer.chars().filter(|c| !c.is_whitespace()).count() >= 3;

                if stale && long_enough {
                    sentence_counter += 1;
                    let text = buffer.trim().to_string();
                    emit_sentence(
                        &session,
                        &outbound,
                        &sentence_tx,
                        text,
                        0.85,
                        sentence_counter,
                    )
                    .await;
                    debug!(
                        language = current_language.as_deref().unwrap_or("unknown"),
                        "incomplete sentence force-flushed"
                    );
                    buffer.clear();
                }
            }
            Ok(None) => break,
            Ok(Some((new_text, language_code))) => {
                last_text_time = Instant::now();
                if let Some(code) = language_code {
                    *detected_languages.entry(code.clone()).or_insert(0) += 1;
                    current_language = Some(code);
                }

                send_status(&outbound, ProcessingStage::NlpAnalyzing).await;

                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(&new_text);
                let joined = buffer.trim().to_string();

                let (sentences, remainder) =
                    split_complete_sentences(&joined, current_language.as_deref());
                for sentence in sentences {
                    sentence_counter += 1;
                    emit_sentence(
                        &session,
                        &outbound,
                        &sentence_tx,
                        sentence,
                        0.9,
                        sentence_counter,
                    )
                    .await;
                }
                buffer = remainder;

                send_status(&outbound, ProcessingStage::Idle).await;
            }
        }
    }

    // Shutdown flush of whatever is left. The session is already inactive
    // at this point, so the frame goes straight to the transport instead of
    // racing the outbound drain.
    let leftover = buffer.trim().to_string();
    if !leftover.is_empty() {
        sentence_counter += 1;
        let payload = SttFinalPayload {
            text: leftover.clone(),
            confidence: 0.8,
            segment_id: format!("{}_sent_{}", session.session_id(), sentence_counter),
            morphemes: None,
            is_complete: true,
        };
        if let Ok(value) = serde_json::to_value(&payload) {
            outbound.send_direct(MessageKind::SttFinal, value).await;
        }
        let _ = sentence_tx.try_send(leftover);
    }

    if !detected_languages.is_empty() {
        let primary = detected_languages
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(lang, _)| lang.clone())
            .unwrap_or_default();
        info!(
            languages = ?detected_languages,
            primary_language = primary.as_str(),
            "session language statistics"
        );
    }

    info!("nlp worker stopped");
}

/// Emits one finalized sentence: an STT_FINAL frame plus the extraction
/// queue entry. The sentence queue waits unbounded; upstream queues bound
/// the producers.
async fn emit_sentence(
    session: &SessionState,
    outbound: &Outbound,
    sentence_tx: &mpsc::Sender<String>,
    text: String,
    confidence: f64,
    counter: u64,
) {
    send_payload(
        outbound,
        MessageKind::SttFinal,
        &SttFinalPayload {
            text: text.clone(),
            confidence,
            segment_id: format!("{}_sent_{}", session.session_id(), counter),
            morphemes: None,
            is_complete: true,
        },
    )
    .await;

    if sentence_tx.send(text).await.is_err() {
        warn!("sentence queue closed");
    }
}

// ============================================
// Worker 3: Extraction
// ============================================

async fn extraction_worker(
    session: Arc<SessionState>,
    outbound: Arc<Outbound>,
    services: PipelineServices,
    batch_size: usize,
    mut sentence_rx: mpsc::Receiver<String>,
) {
    info!("extraction worker started");

    let mut sentence_buffer: Vec<String> = Vec::new();
    let mut last_extraction = Instant::now();

    while session.is_active() {
        match tokio::time::timeout(Duration::from_secs(1), sentence_rx.recv()).await {
            Err(_) => {}
            Ok(None) => break,
            Ok(Some(sentence)) => sentence_buffer.push(sentence),
        }

        let should_extract = sentence_buffer.len() >= batch_size
            || (!sentence_buffer.is_empty()
                && last_extraction.elapsed() > EXTRACTION_MAX_WAIT);
        if !should_extract {
            continue;
        }

        let combined = sentence_buffer.join(" ");
        sentence_buffer.clear();
        last_extraction = Instant::now();

        run_extraction(&session, &outbound, &services, &combined).await;
    }

    info!("extraction worker stopped");
}

/// One extraction cycle: prompt context snapshot, streaming application of
/// entities, then the relations pass with the accumulated id map.
async fn run_extraction<'a>(
    session: &'a Arc<SessionState>,
    outbound: &'a Arc<Outbound>,
    services: &'a PipelineServices,
    text: &'a str,
) {
    send_status(outbound, ProcessingStage::Extracting).await;

    let session_id = session.session_id();
    let snapshot = services.graph.get_state(&session_id).await;
    let guidance = match &services.feedback {
        Some(feedback) => feedback.improvement_context().await,
        None => None,
    };

    let started = Instant::now();

    // Entities are applied to the graph as soon as the parser completes
    // them; relations wait for the end of the stream so every endpoint the
    // model references already has a persistent id. The permit bounds
    // concurrent generator calls process-wide and is released once the
    // stream has been consumed.
    let id_map = tokio::sync::Mutex::new(IdMap::new());
    let result = {
        let _permit = match services.extraction_limit.acquire().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        services
            .extractor
            .extract_streaming(
                text,
                &snapshot.entities,
                &snapshot.relations,
                guidance.as_deref(),
                |entities, _relations| {
                    Box::pin(async {
                        if entities.is_empty() {
                            return;
                        }
                        let partial = ExtractionResult {
                            entities,
                            relations: Vec::new(),
                        };
                        let mut map = id_map.lock().await;
                        match services
                            .graph
                            .apply_extraction_with_id_map(&session_id, &partial, map.clone())
                            .await
                        {
                            Ok((delta, new_map)) => {
                                *map = new_map;
                                if !delta.is_empty() {
                                    send_delta(outbound, &delta).await;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "partial entity application failed");
                            }
                        }
                    })
                },
            )
            .await
    };

    if !result.relations.is_empty() {
        let relations_only = ExtractionResult {
            entities: Vec::new(),
            relations: result.relations.clone(),
        };
        let map = id_map.into_inner();
        match services
            .graph
            .apply_extraction_with_id_map(&session_id, &relations_only, map)
            .await
        {
            Ok((delta, _)) => {
                if !delta.added_relations.is_empty() {
                    send_status(outbound, ProcessingStage::UpdatingGraph).await;
                    send_delta(outbound, &delta).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "relation application failed");
            }
        }
    }

    if let Some(feedback) = &services.feedback {
        let record = ExtractionRecord {
            session_id: session_id.clone(),
            text_input: text.chars().take(1000).collect(),
            entities_count: result.entities.len(),
            relations_count: result.relations.len(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            entities_json: serde_json::to_string(&result.entities).unwrap_or_default(),
            relations_json: serde_json::to_string(&result.relations).unwrap_or_default(),
        };
        let feedback = feedback.clone();
        tokio::spawn(async move {
            feedback.log_extraction(record).await;
        });
    }

    if !result.is_empty() {
        info!(
            entities = result.entities.len(),
            relations = result.relations.len(),
            "extraction complete"
        );
    }

    send_status(outbound, ProcessingStage::Idle).await;
}

async fn send_delta(outbound: &Outbound, delta: &GraphDelta) {
    send_payload(outbound, MessageKind::GraphDelta, delta).await;
}

// ============================================
// Worker 4: Heartbeat
// ============================================

async fn heartbeat_worker(session: Arc<SessionState>, outbound: Arc<Outbound>) {
    info!("heartbeat worker started");

    'ticks: while session.is_active() {
        // Sleep in one-second slices so deactivation is observed promptly.
        let mut slept = Duration::ZERO;
        while slept < HEARTBEAT_INTERVAL {
            tokio::time::sleep(Duration::from_secs(1)).await;
            slept += Duration::from_secs(1);
            if !session.is_active() {
                break 'ticks;
            }
        }

        let silent_for = session.seconds_since_activity();
        if silent_for > HEARTBEAT_TIMEOUT_SECS {
            warn!(
                session_id = session.session_id().as_str(),
                silent_for, "heartbeat timeout, deactivating session"
            );
            session.deactivate();
            break;
        }

        // A failed ping means the transport is gone.
        if !outbound.send(MessageKind::Ping, serde_json::json!({})).await {
            warn!(
                session_id = session.session_id().as_str(),
                "ping failed, deactivating session"
            );
            session.deactivate();
            break;
        }

        debug!(
            session_id = session.session_id().as_str(),
            messages_sent = session.messages_sent(),
            audio_buffer_bytes = session.accumulated_audio_bytes(),
            "heartbeat sent"
        );
    }

    info!("heartbeat worker stopped");
}
