// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Voxgraph's external collaborators.

pub mod adapter;
pub mod generator;
pub mod graph_store;
pub mod object_store;
pub mod speech;
pub mod transport;
pub mod warehouse;

pub use adapter::ServiceAdapter;
pub use generator::{GenerationConfig, GeneratorAdapter, TextChunkStream};
pub use graph_store::GraphStore;
pub use object_store::ObjectStore;
pub use speech::SpeechAdapter;
pub use transport::FrameSink;
pub use warehouse::Warehouse;
