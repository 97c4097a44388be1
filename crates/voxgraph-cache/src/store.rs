// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed [`GraphStore`] implementation.
//!
//! Connection handling is fail-soft: a missing Redis never takes the server
//! down. Initial connection retries with exponential backoff (up to 10
//! attempts), then a background task re-checks every 10 seconds for as long
//! as the store lives. Operations issued while disconnected return a cache
//! error that callers downgrade to in-memory-only operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use voxgraph_core::types::{HealthStatus, SessionGraph};
use voxgraph_core::{GraphStore, ServiceAdapter, VoxgraphError};

/// Maximum initial connection attempts before falling back to the slow loop.
const MAX_CONNECT_ATTEMPTS: u32 = 10;

/// Base delay for exponential backoff between connection attempts.
const CONNECT_RETRY_BASE: Duration = Duration::from_secs(2);

/// Interval of the background liveness/reconnect loop.
const RECONNECT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Overall deadline for a single connection establishment.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redis-backed session graph store.
pub struct RedisGraphStore {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    ttl_secs: u64,
    reconnect_running: AtomicBool,
}

impl RedisGraphStore {
    /// Creates a store for the given Redis URL. Does not connect.
    pub fn new(url: &str, ttl_secs: u64) -> Result<Self, VoxgraphError> {
        let client = redis::Client::open(url).map_err(|e| VoxgraphError::Cache {
            message: format!("invalid redis url {url}: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            ttl_secs,
            reconnect_running: AtomicBool::new(false),
        })
    }

    /// Establishes the initial connection with exponential backoff and starts
    /// the background reconnect loop.
    ///
    /// Never returns an error: a Redis that stays down leaves the store in
    /// disconnected (fail-soft) mode.
    pub async fn connect(self: &Arc<Self>) {
        for attempt in 0..MAX_CONNECT_ATTEMPTS {
            if self.try_connect().await {
                info!(attempt = attempt + 1, "cache connected");
                self.spawn_reconnect_loop();
                return;
            }
            let wait = CONNECT_RETRY_BASE * 2u32.saturating_pow(attempt);
            warn!(
                attempt = attempt + 1,
                max_attempts = MAX_CONNECT_ATTEMPTS,
                wait_secs = wait.as_secs(),
                "cache connection failed, retrying"
            );
            tokio::time::sleep(wait).await;
        }

        warn!(
            attempts = MAX_CONNECT_ATTEMPTS,
            "cache unreachable after retries, continuing without persistence"
        );
        self.spawn_reconnect_loop();
    }

    /// One connection attempt, bounded by [`CONNECT_TIMEOUT`].
    async fn try_connect(&self) -> bool {
        let connect = self.client.get_multiplexed_tokio_connection();
        match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
            Ok(Ok(mut conn)) => {
                let pong: Result<String, _> =
                    redis::cmd("PING").query_async(&mut conn).await;
                if pong.is_ok() {
                    *self.conn.lock().await = Some(conn);
                    true
                } else {
                    false
                }
            }
            Ok(Err(e)) => {
                debug!(error = %e, "cache connection error");
                false
            }
            Err(_) => {
                debug!("cache connection timed out");
                false
            }
        }
    }

    /// Spawns the background loop that re-establishes a dead connection
    /// every [`RECONNECT_CHECK_INTERVAL`]. Idempotent.
    fn spawn_reconnect_loop(self: &Arc<Self>) {
        if self.reconnect_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(RECONNECT_CHECK_INTERVAL).await;
                if !store.is_connected().await {
                    info!("cache reconnect attempt");
                    store.try_connect().await;
                }
            }
        });
    }

    /// Returns a usable connection handle, or a cache error while disconnected.
    async fn connection(&self) -> Result<MultiplexedConnection, VoxgraphError> {
        self.conn
            .lock()
            .await
            .clone()
            .ok_or_else(|| VoxgraphError::cache("not connected"))
    }

    /// Pings the current connection, dropping it on failure.
    async fn is_connected(&self) -> bool {
        let mut guard = self.conn.lock().await;
        let Some(conn) = guard.as_mut() else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(conn).await;
        if pong.is_err() {
            *guard = None;
            return false;
        }
        true
    }

    fn graph_key(session_id: &str) -> String {
        format!("graph:{session_id}")
    }

    fn snapshot_key(session_id: &str, version: u64) -> String {
        format!("graph:{session_id}:snapshot:{version}")
    }

    async fn set_json(
        &self,
        key: &str,
        graph: &SessionGraph,
    ) -> Result<(), VoxgraphError> {
        let json = serde_json::to_string(graph).map_err(|e| VoxgraphError::Cache {
            message: format!("graph serialization failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, json, self.ttl_secs)
            .await
            .map_err(|e| VoxgraphError::Cache {
                message: format!("SET {key} failed: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

#[async_trait]
impl ServiceAdapter for RedisGraphStore {
    fn name(&self) -> &str {
        "redis-graph-store"
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxgraphError> {
        if self.is_connected().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("cache unreachable".to_string()))
        }
    }
}

#[async_trait]
impl GraphStore for RedisGraphStore {
    async fn save_graph(
        &self,
        session_id: &str,
        graph: &SessionGraph,
    ) -> Result<(), VoxgraphError> {
        self.set_json(&Self::graph_key(session_id), graph).await
    }

    async fn load_graph(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionGraph>, VoxgraphError> {
        let mut conn = self.connection().await?;
        let key = Self::graph_key(session_id);
        let data: Option<String> =
            conn.get(&key).await.map_err(|e| VoxgraphError::Cache {
                message: format!("GET {key} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        match data {
            Some(json) => {
                let graph =
                    serde_json::from_str(&json).map_err(|e| VoxgraphError::Cache {
                        message: format!("stored graph for {session_id} is corrupt: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                Ok(Some(graph))
            }
            None => Ok(None),
        }
    }

    async fn save_snapshot(
        &self,
        session_id: &str,
        version: u64,
        graph: &SessionGraph,
    ) -> Result<(), VoxgraphError> {
        self.set_json(&Self::snapshot_key(session_id, version), graph)
            .await
    }

    async fn clear_session(&self, session_id: &str) -> Result<(), VoxgraphError> {
        let mut conn = self.connection().await?;
        let pattern = format!("graph:{session_id}*");
        let keys: Vec<String> =
            conn.keys(&pattern).await.map_err(|e| VoxgraphError::Cache {
                message: format!("KEYS {pattern} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !keys.is_empty() {
            let deleted = keys.len();
            conn.del::<_, ()>(keys).await.map_err(|e| VoxgraphError::Cache {
                message: format!("DEL for session {session_id} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
            info!(session_id, deleted, "session cache cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(RedisGraphStore::graph_key("s-1"), "graph:s-1");
        assert_eq!(
            RedisGraphStore::snapshot_key("s-1", 10),
            "graph:s-1:snapshot:10"
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(RedisGraphStore::new("not a url", 60).is_err());
    }

    #[tokio::test]
    async fn operations_fail_soft_while_disconnected() {
        let store = RedisGraphStore::new("redis://127.0.0.1:1/0", 60).unwrap();
        let err = store.load_graph("s-1").await.expect_err("no connection");
        assert!(matches!(err, VoxgraphError::Cache { .. }));
    }

    #[tokio::test]
    async fn health_reports_unreachable_without_connection() {
        let store = RedisGraphStore::new("redis://127.0.0.1:1/0", 60).unwrap();
        match store.health_check().await.unwrap() {
            HealthStatus::Unhealthy(msg) => assert!(msg.contains("unreachable")),
            other => panic!("expected Unhealthy, got {other:?}"),
        }
    }
}
