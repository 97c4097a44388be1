// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters for deterministic testing.
//!
//! Each mock implements the corresponding core trait with scripted,
//! in-memory behavior, enabling fast CI-runnable tests without external
//! services.

pub mod mock_feedback;
pub mod mock_generator;
pub mod mock_speech;
pub mod mock_store;
pub mod recording_sink;

pub use mock_feedback::{MemoryObjectStore, MemoryWarehouse};
pub use mock_generator::MockGenerator;
pub use mock_speech::MockSpeech;
pub use mock_store::MemoryGraphStore;
pub use recording_sink::RecordingSink;
