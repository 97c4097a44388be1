// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session graph state management.
//!
//! The [`GraphManager`] is the single writer for every session graph: it
//! reconciles extracted entities against existing ones, binds relations
//! across temporary-id and label references, enforces monotonic versioning,
//! and persists each committed version to the cache.

pub mod manager;
pub mod similarity;

pub use manager::{GraphManager, IdMap};
