// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded queues connecting the pipeline stages.
//!
//! Capacities and producer-wait policies per queue:
//!
//! | queue    | capacity | policy on full                    |
//! |----------|---------:|-----------------------------------|
//! | audio    |      100 | 500 ms producer wait, then drop   |
//! | text     |      100 | 1 s producer wait, then drop      |
//! | sentence |      100 | unbounded wait (upstream bounded) |
//! | outbound |      200 | 1 s wait, then drop non-urgent    |

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use voxgraph_core::types::AudioFormat;

pub const AUDIO_QUEUE_CAPACITY: usize = 100;
pub const TEXT_QUEUE_CAPACITY: usize = 100;
pub const SENTENCE_QUEUE_CAPACITY: usize = 100;
pub const OUTBOUND_QUEUE_CAPACITY: usize = 200;

pub const AUDIO_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(500);
pub const TEXT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(1);
pub const OUTBOUND_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

/// One decoded audio segment headed for the recognizer.
pub type AudioItem = (Vec<u8>, AudioFormat);

/// One transcript plus the language code the recognizer detected.
pub type TextItem = (String, Option<String>);

/// Sends with a bounded producer wait; on timeout the item is dropped and a
/// warning logged. Returns whether the item was enqueued.
pub async fn send_bounded<T>(
    tx: &mpsc::Sender<T>,
    item: T,
    timeout: Duration,
    queue_name: &str,
) -> bool {
    match tx.send_timeout(item, timeout).await {
        Ok(()) => true,
        Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
            warn!(queue = queue_name, "queue full, item dropped");
            false
        }
        Err(mpsc::error::SendTimeoutError::Closed(_)) => {
            warn!(queue = queue_name, "queue closed, item dropped");
            false
        }
    }
}
