//! Connection hub
//!
//! The transport-side pub/sub primitive: every live connection, addressable
//! by id, plus broadcast-to-all. The registry, presence and relay only ever
//! see connection ids and go through [`ConnectionHub`] to reach a socket.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use duochat_shared::ConnectionId;
use tokio::sync::RwLock;

use super::connection::{Connection, Delivery};
use super::events::ServerEvent;

/// Per-broadcast delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Push events to live connections
#[async_trait]
pub trait ConnectionHub: Send + Sync {
    /// Queue an event for one connection. Never blocks on the socket.
    async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> Delivery;

    /// Queue an event for every live connection. A failure on one
    /// connection never stops delivery to the rest.
    async fn broadcast(&self, event: ServerEvent) -> BroadcastReport;
}

/// [`ConnectionHub`] over per-connection mpsc queues
#[derive(Clone, Default)]
pub struct ChannelHub {
    /// All live connections indexed by connection id
    connections: Arc<RwLock<HashMap<ConnectionId, Arc<Connection>>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection
    pub async fn attach(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.id, Arc::clone(&conn));

        tracing::debug!(
            session_id = %conn.id,
            user_id = ?conn.user_id,
            total_connections = connections.len(),
            "Connection attached to hub"
        );

        conn
    }

    /// Remove a connection
    pub async fn detach(&self, connection_id: &ConnectionId) -> Option<Arc<Connection>> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(connection_id);

        if let Some(conn) = &removed {
            tracing::debug!(
                session_id = %connection_id,
                user_id = ?conn.user_id,
                remaining_connections = connections.len(),
                "Connection detached from hub"
            );
        }

        removed
    }

    /// Get total number of live connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[async_trait]
impl ConnectionHub for ChannelHub {
    async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> Delivery {
        let conn = self.connections.read().await.get(&connection_id).cloned();
        match conn {
            Some(conn) => conn.send(event),
            None => Delivery::Unknown,
        }
    }

    async fn broadcast(&self, event: ServerEvent) -> BroadcastReport {
        // Copy the targets out so no send happens under the lock
        let targets: Vec<Arc<Connection>> =
            self.connections.read().await.values().cloned().collect();

        let mut report = BroadcastReport::default();
        for conn in &targets {
            match conn.send(event.clone()) {
                Delivery::Queued => report.delivered += 1,
                other => {
                    report.dropped += 1;
                    tracing::debug!(
                        session_id = %conn.id,
                        delivery = ?other,
                        "Broadcast skipped connection"
                    );
                }
            }
        }

        tracing::debug!(
            event_type = event.kind(),
            recipients = report.delivered,
            failed = report.dropped,
            "Broadcast event to all connections"
        );

        report
    }
}
