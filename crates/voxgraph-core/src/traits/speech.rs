// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech recognizer adapter trait.

use async_trait::async_trait;

use crate::error::VoxgraphError;
use crate::traits::adapter::ServiceAdapter;
use crate::types::{AudioFormat, Transcript};

/// Adapter for streaming speech recognition backends.
///
/// The caller (the STT worker) enforces the per-call timeout; adapters only
/// need to map one audio segment to at most one transcript.
#[async_trait]
pub trait SpeechAdapter: ServiceAdapter {
    /// Transcribes a single audio segment.
    ///
    /// `language_codes` carries the session's negotiated BCP-47 hints, or
    /// `["auto"]` for automatic detection. Returns `None` when the segment
    /// produced no speech.
    async fn transcribe_chunk(
        &self,
        audio: &[u8],
        format: &AudioFormat,
        segment_id: &str,
        language_codes: &[String],
    ) -> Result<Option<Transcript>, VoxgraphError>;
}
