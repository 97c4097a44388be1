// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio format descriptor and recognizer result types.

use serde::{Deserialize, Serialize};

/// Audio format negotiated per chunk (or per session via the start frame).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    /// Codec name: "pcm", "wav", "webm", "opus", "mp3", "flac".
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<u16>,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            codec: "pcm".to_string(),
            sample_rate: 16_000,
            channels: 1,
            bit_depth: Some(16),
        }
    }
}

/// One recognizer result for a single audio segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub confidence: f64,
    /// BCP-47 code the recognizer detected, when available.
    pub language_code: Option<String>,
}
