// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback collection for Voxgraph: blob uploads, warehouse rows, and the
//! loop that turns user ratings into extraction guidance.

pub mod manager;
pub mod object_store;
pub mod warehouse;

pub use manager::{FeedbackManager, FeedbackUris};
pub use object_store::ObjectStoreClient;
pub use warehouse::WarehouseClient;
