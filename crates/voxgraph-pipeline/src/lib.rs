// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection streaming pipeline for Voxgraph.
//!
//! Audio frames go in; partial transcripts, finalized sentences, and graph
//! deltas come out, all serialized over one outbound channel.

pub mod outbound;
pub mod pipeline;
pub mod queues;
pub mod sentence;
pub mod session;

pub use outbound::Outbound;
pub use pipeline::{Pipeline, PipelineOptions, PipelineServices};
pub use session::SessionState;
