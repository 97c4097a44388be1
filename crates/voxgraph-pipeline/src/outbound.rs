// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound frame serialization.
//!
//! All frames except PING/PONG go through a bounded queue drained by a
//! single sender task, so the transport sees one writer and strict FIFO
//! order. Urgent frames are written directly, serialized against queue
//! drains by the shared rate-limiter lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{error, info, warn};

use voxgraph_core::types::{MessageKind, WsEnvelope};
use voxgraph_core::FrameSink;

use crate::queues::{send_bounded, OUTBOUND_ENQUEUE_TIMEOUT, OUTBOUND_QUEUE_CAPACITY};
use crate::session::SessionState;

/// Minimum spacing between transport writes (<= 50 msgs/s).
const MIN_SEND_INTERVAL: Duration = Duration::from_millis(10);

/// Pause between batches.
const BATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Messages taken per batch: one blocking take plus up to nine more.
const BATCH_SIZE: usize = 10;

/// Blocking wait for the first message of a batch.
const BATCH_FIRST_WAIT: Duration = Duration::from_millis(500);

/// Per-frame transport write timeout.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// A queued frame: kind plus its payload.
pub type OutboundItem = (MessageKind, serde_json::Value);

/// Producer handle shared by every worker and the router.
pub struct Outbound {
    tx: mpsc::Sender<OutboundItem>,
    sink: Arc<dyn FrameSink>,
    session: Arc<SessionState>,
    /// Serializes transport writes and carries the rate-limit clock.
    last_send: Mutex<Instant>,
}

impl Outbound {
    /// Creates the handle and the receiver for the sender worker.
    pub fn new(
        sink: Arc<dyn FrameSink>,
        session: Arc<SessionState>,
    ) -> (Arc<Self>, mpsc::Receiver<OutboundItem>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let outbound = Arc::new(Self {
            tx,
            sink,
            session,
            last_send: Mutex::new(Instant::now()),
        });
        (outbound, rx)
    }

    /// Sends a frame: urgent kinds go straight to the transport, everything
    /// else is enqueued with a bounded wait. Returns whether the frame was
    /// accepted (queued or written).
    pub async fn send(&self, kind: MessageKind, payload: serde_json::Value) -> bool {
        if !self.session.is_active() {
            return false;
        }
        if kind.is_urgent() {
            return self.send_direct(kind, payload).await;
        }
        send_bounded(&self.tx, (kind, payload), OUTBOUND_ENQUEUE_TIMEOUT, "outbound").await
    }

    /// Writes one frame to the transport, honoring the rate limit.
    pub(crate) async fn send_direct(
        &self,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> bool {
        // Holding the lock across the write keeps urgent frames from
        // interleaving with queue drains.
        let mut last_send = self.last_send.lock().await;
        let elapsed = last_send.elapsed();
        if elapsed < MIN_SEND_INTERVAL {
            tokio::time::sleep(MIN_SEND_INTERVAL - elapsed).await;
        }

        let envelope = WsEnvelope::new(kind, payload, chrono::Utc::now().timestamp_millis());
        let frame = match serde_json::to_string(&envelope) {
            Ok(frame) => frame,
            Err(e) => {
                error!(kind = %kind, error = %e, "frame serialization failed");
                return false;
            }
        };

        let sent = tokio::time::timeout(SEND_TIMEOUT, self.sink.send_frame(frame)).await;
        *last_send = Instant::now();

        match sent {
            Ok(Ok(())) => {
                self.session.record_message_sent();
                true
            }
            Ok(Err(e)) => {
                error!(kind = %kind, error = %e, "frame send failed");
                false
            }
            Err(_) => {
                error!(kind = %kind, "frame send timed out");
                false
            }
        }
    }
}

/// Single sender task draining the outbound queue in batches.
pub struct OutboundWorker {
    outbound: Arc<Outbound>,
    rx: mpsc::Receiver<OutboundItem>,
    session: Arc<SessionState>,
}

impl OutboundWorker {
    pub fn new(
        outbound: Arc<Outbound>,
        rx: mpsc::Receiver<OutboundItem>,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            outbound,
            rx,
            session,
        }
    }

    /// Drains the queue until the session deactivates, then flushes
    /// best-effort.
    pub async fn run(mut self) {
        info!("outbound sender started");

        while self.session.is_active() {
            let first = match tokio::time::timeout(BATCH_FIRST_WAIT, self.rx.recv()).await {
                Err(_) => continue,
                Ok(None) => break,
                Ok(Some(item)) => item,
            };

            let mut batch = vec![first];
            while batch.len() < BATCH_SIZE {
                match self.rx.try_recv() {
                    Ok(item) => batch.push(item),
                    Err(_) => break,
                }
            }

            for (kind, payload) in batch {
                if !self.outbound.send_direct(kind, payload).await {
                    warn!(kind = %kind, "outbound send failed, frame dropped");
                }
            }

            tokio::time::sleep(BATCH_INTERVAL).await;
        }

        // Best-effort drain of whatever is still queued.
        while let Ok((kind, payload)) = self.rx.try_recv() {
            let _ = self.outbound.send_direct(kind, payload).await;
        }

        info!(
            messages_sent = self.session.messages_sent(),
            "outbound sender stopped"
        );
    }
}
