// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all external-service adapters implement.

use async_trait::async_trait;

use crate::error::VoxgraphError;
use crate::types::HealthStatus;

/// The base trait for all Voxgraph external-service adapters.
///
/// Every adapter (speech recognizer, LLM generator, cache, object store,
/// warehouse) implements this trait, which provides identity and health
/// check capabilities for the `/health` surface.
#[async_trait]
pub trait ServiceAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), VoxgraphError> {
        Ok(())
    }
}
