// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech recognizer adapter for Voxgraph.

pub mod client;
pub mod types;

pub use client::SpeechClient;
