// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface and WebSocket session router for Voxgraph.
//!
//! One axum server carries both the management endpoints and the `/ws`
//! streaming endpoint. Each accepted WebSocket connection gets its own
//! session state and pipeline; external-service clients are shared
//! process-wide through [`state::AppContext`].

pub mod handlers;
pub mod server;
pub mod state;
pub mod ws;

pub use server::{build_router, start_server};
pub use state::AppContext;
