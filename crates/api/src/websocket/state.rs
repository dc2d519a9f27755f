//! Global WebSocket state management
//!
//! Wires the hub, registry, presence, relay and lifecycle together and is
//! the only surface the HTTP layer touches.

use std::collections::BTreeSet;
use std::sync::Arc;

use duochat_shared::{ConnectionId, Message, UserId};

use super::hub::{ChannelHub, ConnectionHub};
use super::lifecycle::LifecycleManager;
use super::presence::PresenceBroadcaster;
use super::registry::ConnectionRegistry;
use super::relay::{MessageRelay, RelayOutcome};

/// Smallest outbound queue that holds the `connected` ack plus the opening roster
pub const MIN_OUTBOUND_QUEUE_CAPACITY: usize = 2;

/// Global WebSocket state shared across all connections
#[derive(Clone)]
pub struct WebSocketState {
    /// Live sockets, owned by the transport
    pub hub: Arc<ChannelHub>,
    registry: Arc<ConnectionRegistry>,
    lifecycle: Arc<LifecycleManager>,
    relay: MessageRelay,
    /// Capacity of each connection's outbound queue
    pub outbound_queue_capacity: usize,
}

impl WebSocketState {
    /// Create new WebSocket state
    pub fn new(outbound_queue_capacity: usize) -> Self {
        let hub = Arc::new(ChannelHub::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let dyn_hub: Arc<dyn ConnectionHub> = hub.clone();

        let presence = PresenceBroadcaster::new(Arc::clone(&registry), Arc::clone(&dyn_hub));
        let relay = MessageRelay::new(Arc::clone(&registry), dyn_hub);
        let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&registry), presence));

        Self {
            hub,
            registry,
            lifecycle,
            relay,
            outbound_queue_capacity: outbound_queue_capacity.max(MIN_OUTBOUND_QUEUE_CAPACITY),
        }
    }

    pub async fn on_connection_opened(&self, connection_id: ConnectionId, user_id: Option<UserId>) {
        self.lifecycle.on_connection_opened(connection_id, user_id).await;
    }

    pub async fn on_connection_closed(&self, connection_id: ConnectionId) -> bool {
        self.lifecycle.on_connection_closed(connection_id).await
    }

    /// Called once a message is durably stored
    pub async fn on_message_persisted(&self, message: &Message) -> RelayOutcome {
        self.relay.relay(message).await
    }

    pub async fn current_online_users(&self) -> BTreeSet<UserId> {
        self.registry.snapshot().await
    }

    /// Get statistics about the WebSocket state
    pub async fn get_stats(&self) -> WebSocketStats {
        WebSocketStats {
            active_connections: self.hub.connection_count().await,
            online_users: self.registry.snapshot().await.len(),
        }
    }
}

impl Default for WebSocketState {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Statistics about WebSocket connections
#[derive(Debug, Clone, serde::Serialize)]
pub struct WebSocketStats {
    /// Number of live connections, anonymous ones included
    pub active_connections: usize,
    /// Number of users with a registered connection
    pub online_users: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::Connection;
    use crate::websocket::events::{MessagePayload, ServerEvent};
    use time::OffsetDateTime;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn message(sender: UserId, receiver: UserId, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            text: text.to_string(),
            image_url: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn last_roster(rx: &mut mpsc::Receiver<ServerEvent>) -> Option<ServerEvent> {
        drain(rx)
            .into_iter()
            .filter(|event| matches!(event, ServerEvent::OnlineRosterChanged { .. }))
            .last()
    }

    fn roster(mut user_ids: Vec<UserId>) -> ServerEvent {
        user_ids.sort();
        ServerEvent::OnlineRosterChanged { user_ids }
    }

    #[tokio::test]
    async fn test_two_user_scenario() {
        let state = WebSocketState::new(16);
        let (u1, u2) = (UserId::new(), UserId::new());

        let (tx1, mut rx1) = mpsc::channel(16);
        let c1 = state.hub.attach(Connection::new(Some(u1), tx1)).await;
        state.on_connection_opened(c1.id, Some(u1)).await;
        assert_eq!(drain(&mut rx1), vec![roster(vec![u1])]);

        let (tx2, mut rx2) = mpsc::channel(16);
        let c2 = state.hub.attach(Connection::new(Some(u2), tx2)).await;
        state.on_connection_opened(c2.id, Some(u2)).await;
        assert_eq!(drain(&mut rx1), vec![roster(vec![u1, u2])]);
        assert_eq!(drain(&mut rx2), vec![roster(vec![u1, u2])]);

        let hi = message(u1, u2, "hi");
        assert_eq!(state.on_message_persisted(&hi).await, RelayOutcome::Delivered(c2.id));
        assert_eq!(
            drain(&mut rx2),
            vec![ServerEvent::MessageReceived(MessagePayload::from(&hi))]
        );
        assert!(drain(&mut rx1).is_empty());

        state.hub.detach(&c1.id).await;
        assert!(state.on_connection_closed(c1.id).await);
        assert_eq!(drain(&mut rx2), vec![roster(vec![u2])]);

        let bye = message(u2, u1, "bye");
        assert_eq!(state.on_message_persisted(&bye).await, RelayOutcome::Offline);
        assert!(drain(&mut rx2).is_empty());
        assert_eq!(state.current_online_users().await, BTreeSet::from([u2]));
    }

    #[tokio::test]
    async fn test_smallest_queue_holds_ack_and_opening_roster() {
        let state = WebSocketState::new(1);
        let user = UserId::new();

        let (tx, mut rx) = mpsc::channel(state.outbound_queue_capacity);
        let conn = state.hub.attach(Connection::new(Some(user), tx)).await;
        conn.send(ServerEvent::Connected { session_id: conn.id });
        state.on_connection_opened(conn.id, Some(user)).await;

        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::Connected { session_id: conn.id }, roster(vec![user])]
        );
    }

    #[tokio::test]
    async fn test_concurrent_connects_converge() {
        let state = WebSocketState::new(128);
        let mut receivers = Vec::new();
        let mut handles = Vec::new();
        let mut users = Vec::new();

        for _ in 0..16 {
            let user = UserId::new();
            users.push(user);
            let (tx, rx) = mpsc::channel(128);
            receivers.push(rx);
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                let conn = state.hub.attach(Connection::new(Some(user), tx)).await;
                state.on_connection_opened(conn.id, Some(user)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Rosters go out in snapshot order, so the last one every client
        // holds covers all registered users
        let expected = roster(users.clone());
        for rx in receivers.iter_mut() {
            assert_eq!(last_roster(rx).as_ref(), Some(&expected));
        }
        assert_eq!(state.get_stats().await.online_users, 16);
    }

    #[tokio::test]
    async fn test_interleaved_connects_and_disconnects_converge() {
        let state = WebSocketState::new(128);
        let mut handles = Vec::new();
        let mut survivors = Vec::new();

        for i in 0..16 {
            let user = UserId::new();
            let (tx, rx) = mpsc::channel(128);
            let leaves = i % 2 == 0;
            if !leaves {
                survivors.push((user, rx));
            }
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                let conn = state.hub.attach(Connection::new(Some(user), tx)).await;
                state.on_connection_opened(conn.id, Some(user)).await;
                if leaves {
                    tokio::task::yield_now().await;
                    state.hub.detach(&conn.id).await;
                    state.on_connection_closed(conn.id).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let expected = roster(survivors.iter().map(|(user, _)| *user).collect());
        for (_, rx) in survivors.iter_mut() {
            assert_eq!(last_roster(rx).as_ref(), Some(&expected));
        }
        assert_eq!(state.get_stats().await.online_users, 8);
        assert_eq!(state.get_stats().await.active_connections, 8);
    }
}
