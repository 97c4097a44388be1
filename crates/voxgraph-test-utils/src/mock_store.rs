// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`GraphStore`] for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use voxgraph_core::types::{HealthStatus, SessionGraph};
use voxgraph_core::{GraphStore, ServiceAdapter, VoxgraphError};

/// A [`GraphStore`] backed by process-local maps.
///
/// Tracks save/snapshot counters so tests can assert persistence behavior,
/// and can be switched into a failing mode to exercise fail-soft paths.
#[derive(Default)]
pub struct MemoryGraphStore {
    graphs: DashMap<String, SessionGraph>,
    snapshots: DashMap<(String, u64), SessionGraph>,
    saves: AtomicU64,
    failing: AtomicBool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_graph` calls so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of snapshots written.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// True when a snapshot exists for the session at the given version.
    pub fn has_snapshot(&self, session_id: &str, version: u64) -> bool {
        self.snapshots
            .contains_key(&(session_id.to_string(), version))
    }

    /// True when a latest-state key exists for the session.
    pub fn has_graph(&self, session_id: &str) -> bool {
        self.graphs.contains_key(session_id)
    }

    /// When set, every operation returns a cache error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), VoxgraphError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(VoxgraphError::cache("mock store failing"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ServiceAdapter for MemoryGraphStore {
    fn name(&self) -> &str {
        "memory-graph-store"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("mock store failing".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn save_graph(
        &self,
        session_id: &str,
        graph: &SessionGraph,
    ) -> Result<(), VoxgraphError> {
        self.check_failing()?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.graphs.insert(session_id.to_string(), graph.clone());
        Ok(())
    }

    async fn load_graph(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionGraph>, VoxgraphError> {
        self.check_failing()?;
        Ok(self.graphs.get(session_id).map(|g| g.clone()))
    }

    async fn save_snapshot(
        &self,
        session_id: &str,
        version: u64,
        graph: &SessionGraph,
    ) -> Result<(), VoxgraphError> {
        self.check_failing()?;
        self.snapshots
            .insert((session_id.to_string(), version), graph.clone());
        Ok(())
    }

    async fn clear_session(&self, session_id: &str) -> Result<(), VoxgraphError> {
        self.check_failing()?;
        self.graphs.remove(session_id);
        self.snapshots
            .retain(|(sid, _), _| sid != session_id);
        Ok(())
    }
}
