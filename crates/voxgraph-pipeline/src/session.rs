// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection session state.
//!
//! Shared by the router and all five workers. The `active` flag is the
//! single cooperative cancellation signal: every worker loop checks it each
//! iteration, and every blocking wait is timeout-bounded so the flag is
//! observed within one tick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use tokio::time::Instant;

use voxgraph_core::types::AudioFormat;

/// Cap on accumulated audio bytes kept for the feedback upload.
pub const MAX_ACCUMULATED_AUDIO_BYTES: usize = 50 * 1024 * 1024;

/// Cap on accumulated audio duration kept for the feedback upload.
pub const MAX_AUDIO_DURATION_MS: u64 = 10 * 60 * 1000;

/// Approximate duration credited back per evicted chunk when over the
/// duration cap.
const EVICTED_CHUNK_DURATION_MS: u64 = 500;

#[derive(Default)]
struct AudioAccumulator {
    chunks: VecDeque<Vec<u8>>,
    total_bytes: usize,
    total_duration_ms: u64,
}

/// State for one client connection.
pub struct SessionState {
    id: RwLock<String>,
    active: AtomicBool,
    sequence: AtomicU64,
    created_at: Instant,
    last_activity: Mutex<Instant>,
    audio_format: Mutex<Option<AudioFormat>>,
    language_codes: Mutex<Option<Vec<String>>>,
    audio: Mutex<AudioAccumulator>,
    clear_on_close: AtomicBool,
    messages_sent: AtomicU64,
}

impl SessionState {
    /// Creates an active session with a provisional id.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            id: RwLock::new(session_id.into()),
            active: AtomicBool::new(true),
            sequence: AtomicU64::new(0),
            created_at: now,
            last_activity: Mutex::new(now),
            audio_format: Mutex::new(None),
            language_codes: Mutex::new(None),
            audio: Mutex::new(AudioAccumulator::default()),
            clear_on_close: AtomicBool::new(false),
            messages_sent: AtomicU64::new(0),
        }
    }

    pub fn session_id(&self) -> String {
        self.id.read().expect("lock poisoned").clone()
    }

    /// Rebinds to a client-supplied id (session resumption).
    pub fn rebind(&self, session_id: &str) {
        *self.id.write().expect("lock poisoned") = session_id.to_string();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The single cooperative cancellation signal for all workers.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Records client activity (any inbound frame).
    pub fn touch_activity(&self) {
        *self.last_activity.lock().expect("lock poisoned") = Instant::now();
    }

    pub fn seconds_since_activity(&self) -> u64 {
        self.last_activity
            .lock()
            .expect("lock poisoned")
            .elapsed()
            .as_secs()
    }

    pub fn session_duration_seconds(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }

    /// Next value of the monotonically increasing segment counter.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub fn set_audio_format(&self, format: AudioFormat) {
        *self.audio_format.lock().expect("lock poisoned") = Some(format);
    }

    /// Codec of the most recent audio format, defaulting to "wav".
    pub fn audio_codec(&self) -> String {
        self.audio_format
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map(|f| f.codec.clone())
            .unwrap_or_else(|| "wav".to_string())
    }

    pub fn set_language_codes(&self, codes: Vec<String>) {
        *self.language_codes.lock().expect("lock poisoned") = Some(codes);
    }

    pub fn language_codes(&self) -> Option<Vec<String>> {
        self.language_codes.lock().expect("lock poisoned").clone()
    }

    pub fn mark_clear_on_close(&self, clear: bool) {
        self.clear_on_close.store(clear, Ordering::SeqCst);
    }

    pub fn should_clear_on_close(&self) -> bool {
        self.clear_on_close.load(Ordering::SeqCst)
    }

    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::SeqCst);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::SeqCst)
    }

    /// Appends a chunk to the capped accumulation buffer, evicting oldest
    /// chunks (FIFO) when the byte or duration cap would be exceeded.
    pub fn add_audio_chunk(&self, data: Vec<u8>, duration_ms: u64) {
        let mut audio = self.audio.lock().expect("lock poisoned");
        let chunk_size = data.len();

        while !audio.chunks.is_empty()
            && audio.total_bytes + chunk_size > MAX_ACCUMULATED_AUDIO_BYTES
        {
            if let Some(removed) = audio.chunks.pop_front() {
                audio.total_bytes -= removed.len();
            }
        }

        if audio.total_duration_ms >= MAX_AUDIO_DURATION_MS {
            if let Some(removed) = audio.chunks.pop_front() {
                audio.total_bytes -= removed.len();
                audio.total_duration_ms =
                    audio.total_duration_ms.saturating_sub(EVICTED_CHUNK_DURATION_MS);
            }
        }

        audio.total_bytes += chunk_size;
        audio.total_duration_ms += duration_ms;
        audio.chunks.push_back(data);
    }

    /// Joined accumulated audio, or `None` when nothing was recorded.
    pub fn accumulated_audio(&self) -> Option<Vec<u8>> {
        let audio = self.audio.lock().expect("lock poisoned");
        if audio.chunks.is_empty() {
            return None;
        }
        let mut joined = Vec::with_capacity(audio.total_bytes);
        for chunk in &audio.chunks {
            joined.extend_from_slice(chunk);
        }
        Some(joined)
    }

    pub fn accumulated_audio_bytes(&self) -> usize {
        self.audio.lock().expect("lock poisoned").total_bytes
    }
}
