// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core trait definitions, error types, and protocol types for the Voxgraph
//! real-time speech-to-knowledge-graph server.

pub mod error;
pub mod traits;
pub mod types;

pub use error::VoxgraphError;
pub use traits::{
    FrameSink, GenerationConfig, GeneratorAdapter, GraphStore, ObjectStore, ServiceAdapter,
    SpeechAdapter, TextChunkStream, Warehouse,
};
