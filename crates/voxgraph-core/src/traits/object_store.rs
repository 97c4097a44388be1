// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object store adapter trait for feedback artifacts.

use async_trait::async_trait;

use crate::error::VoxgraphError;
use crate::traits::adapter::ServiceAdapter;
use crate::types::SessionGraph;

/// Adapter for blob uploads (session audio, graph snapshots, logs).
///
/// All methods return the URI of the stored object. Paths are keyed by
/// session and timestamp: `audio/YYYY/MM/DD/HH/<session>_<short>.<codec>`,
/// `graphs/YYYY/MM/DD/<session>_v<version>.json`,
/// `logs/YYYY/MM/DD/HH/<session>.json`.
#[async_trait]
pub trait ObjectStore: ServiceAdapter {
    /// Uploads accumulated session audio.
    async fn upload_audio(
        &self,
        session_id: &str,
        audio: &[u8],
        codec: &str,
    ) -> Result<String, VoxgraphError>;

    /// Uploads a graph snapshot.
    async fn upload_graph(
        &self,
        session_id: &str,
        graph: &SessionGraph,
    ) -> Result<String, VoxgraphError>;

    /// Uploads a session log document.
    async fn upload_session_log(
        &self,
        session_id: &str,
        log: &serde_json::Value,
    ) -> Result<String, VoxgraphError>;
}
