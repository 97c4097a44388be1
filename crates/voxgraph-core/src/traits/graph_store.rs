// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped graph persistence trait.

use async_trait::async_trait;

use crate::error::VoxgraphError;
use crate::traits::adapter::ServiceAdapter;
use crate::types::SessionGraph;

/// Adapter for the session-scoped graph cache.
///
/// Keys are `graph:<session>` for the latest state and
/// `graph:<session>:snapshot:<version>` for periodic snapshots, both with a
/// 24-hour TTL. A session's graph has exactly one writer (its graph
/// manager), so no cross-process coordination is needed.
#[async_trait]
pub trait GraphStore: ServiceAdapter {
    /// Persists the latest graph state for a session.
    async fn save_graph(
        &self,
        session_id: &str,
        graph: &SessionGraph,
    ) -> Result<(), VoxgraphError>;

    /// Loads the latest graph state, or `None` if the session has none.
    async fn load_graph(&self, session_id: &str)
        -> Result<Option<SessionGraph>, VoxgraphError>;

    /// Writes a versioned snapshot alongside the latest state.
    async fn save_snapshot(
        &self,
        session_id: &str,
        version: u64,
        graph: &SessionGraph,
    ) -> Result<(), VoxgraphError>;

    /// Deletes every key belonging to a session.
    async fn clear_session(&self, session_id: &str) -> Result<(), VoxgraphError>;
}
