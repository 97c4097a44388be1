// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`FrameSink`] that records frames for assertions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use voxgraph_core::types::{MessageKind, WsEnvelope};
use voxgraph_core::{FrameSink, VoxgraphError};

/// A [`FrameSink`] that appends every frame to an in-memory log.
///
/// Can be switched into a failing mode to exercise transport-error paths.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw frames in send order.
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().expect("lock poisoned").clone()
    }

    /// Parsed envelopes in send order.
    pub fn envelopes(&self) -> Vec<WsEnvelope> {
        self.frames()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }

    /// Message kinds in send order.
    pub fn kinds(&self) -> Vec<MessageKind> {
        self.envelopes().iter().map(|e| e.kind).collect()
    }

    /// Kinds excluding heartbeat traffic, for order assertions.
    pub fn kinds_without_heartbeat(&self) -> Vec<MessageKind> {
        self.kinds()
            .into_iter()
            .filter(|k| !matches!(k, MessageKind::Ping | MessageKind::Pong))
            .collect()
    }

    /// When set, every send fails with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_frame(&self, frame: String) -> Result<(), VoxgraphError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(VoxgraphError::transport("recording sink failing"));
        }
        self.frames.lock().expect("lock poisoned").push(frame);
        Ok(())
    }
}
