// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client transport seam.

use async_trait::async_trait;

use crate::error::VoxgraphError;

/// Single-writer sink for serialized frames headed to one client.
///
/// The outbound serializer is the only caller for structured frames;
/// urgent PING/PONG writes share the same sink and rely on its internal
/// write exclusivity.
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    /// Writes one serialized frame to the client.
    async fn send_frame(&self, frame: String) -> Result<(), VoxgraphError>;
}
