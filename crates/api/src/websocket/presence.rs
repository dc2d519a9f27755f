//! Online roster broadcasting

use std::sync::Arc;

use duochat_shared::ConnectionId;
use tokio::sync::Mutex;

use super::connection::Delivery;
use super::events::ServerEvent;
use super::hub::{BroadcastReport, ConnectionHub};
use super::registry::ConnectionRegistry;

/// Pushes the current online roster to live connections
#[derive(Clone)]
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
    hub: Arc<dyn ConnectionHub>,
    /// Held from snapshot to send so rosters go out in snapshot order
    send_lock: Arc<Mutex<()>>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, hub: Arc<dyn ConnectionHub>) -> Self {
        Self {
            registry,
            hub,
            send_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn roster_event(&self) -> ServerEvent {
        let user_ids = self.registry.snapshot().await.into_iter().collect();
        ServerEvent::OnlineRosterChanged { user_ids }
    }

    /// Send the roster to every live connection, anonymous ones included
    pub async fn announce(&self) -> BroadcastReport {
        let _guard = self.send_lock.lock().await;
        let event = self.roster_event().await;
        self.hub.broadcast(event).await
    }

    /// Send the roster to a single connection
    pub async fn announce_to(&self, connection_id: ConnectionId) -> Delivery {
        let _guard = self.send_lock.lock().await;
        let event = self.roster_event().await;
        self.hub.send_to(connection_id, event).await
    }
}
