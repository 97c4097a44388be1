// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Voxgraph server.
//!
//! Layered loading (defaults, system TOML, user TOML, local TOML, env vars)
//! into a strongly typed [`model::VoxgraphConfig`].

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::VoxgraphConfig;
