// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed session graph persistence for Voxgraph.

pub mod store;

pub use store::RedisGraphStore;
