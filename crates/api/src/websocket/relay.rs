//! Live relay of persisted messages
//!
//! Best effort: at most one push per message. Anything missed here is still
//! in the message history.

use std::sync::Arc;

use duochat_shared::{ConnectionId, Message};

use super::connection::Delivery;
use super::events::{MessagePayload, ServerEvent};
use super::hub::ConnectionHub;
use super::registry::ConnectionRegistry;

/// What happened to one relayed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued on the receiver's live connection
    Delivered(ConnectionId),
    /// Receiver has no live connection
    Offline,
    /// Receiver was online at lookup but the push did not go through
    Dropped(ConnectionId),
}

/// Pushes freshly persisted messages to the receiver's live connection
#[derive(Clone)]
pub struct MessageRelay {
    registry: Arc<ConnectionRegistry>,
    hub: Arc<dyn ConnectionHub>,
}

impl MessageRelay {
    pub fn new(registry: Arc<ConnectionRegistry>, hub: Arc<dyn ConnectionHub>) -> Self {
        Self { registry, hub }
    }

    pub async fn relay(&self, message: &Message) -> RelayOutcome {
        let Some(connection_id) = self.registry.lookup(message.receiver_id).await else {
            tracing::debug!(
                message_id = %message.id,
                receiver_id = %message.receiver_id,
                "Receiver offline, message left in history"
            );
            return RelayOutcome::Offline;
        };

        let event = ServerEvent::MessageReceived(MessagePayload::from(message));
        match self.hub.send_to(connection_id, event).await {
            Delivery::Queued => {
                tracing::debug!(
                    message_id = %message.id,
                    receiver_id = %message.receiver_id,
                    session_id = %connection_id,
                    "Relayed message"
                );
                RelayOutcome::Delivered(connection_id)
            }
            delivery => {
                tracing::warn!(
                    message_id = %message.id,
                    receiver_id = %message.receiver_id,
                    session_id = %connection_id,
                    delivery = ?delivery,
                    "Live push dropped"
                );
                RelayOutcome::Dropped(connection_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::Connection;
    use crate::websocket::hub::ChannelHub;
    use duochat_shared::UserId;
    use time::OffsetDateTime;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn message(sender: UserId, receiver: UserId, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            text: text.to_string(),
            image_url: Some("https://cdn.example.com/cat.png".to_string()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn test_relay_to_online_receiver_only() {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(ChannelHub::new());
        let relay = MessageRelay::new(Arc::clone(&registry), hub.clone());

        let (sender_tx, mut sender_rx) = mpsc::channel(4);
        let (receiver_tx, mut receiver_rx) = mpsc::channel(4);
        let sender_conn = hub.attach(Connection::new(None, sender_tx)).await;
        let receiver_conn = hub.attach(Connection::new(None, receiver_tx)).await;

        let (sender, receiver) = (UserId::new(), UserId::new());
        registry.register(sender, sender_conn.id).await;
        registry.register(receiver, receiver_conn.id).await;

        let msg = message(sender, receiver, "hi");
        assert_eq!(relay.relay(&msg).await, RelayOutcome::Delivered(receiver_conn.id));

        assert_eq!(
            receiver_rx.try_recv().ok(),
            Some(ServerEvent::MessageReceived(MessagePayload::from(&msg)))
        );
        assert!(receiver_rx.try_recv().is_err());
        assert!(sender_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_relay_to_offline_receiver() {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(ChannelHub::new());
        let relay = MessageRelay::new(registry, hub);

        let msg = message(UserId::new(), UserId::new(), "anyone there?");
        assert_eq!(relay.relay(&msg).await, RelayOutcome::Offline);
    }

    #[tokio::test]
    async fn test_relay_when_connection_vanished_after_lookup() {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(ChannelHub::new());
        let relay = MessageRelay::new(Arc::clone(&registry), hub.clone());

        let (tx, _rx) = mpsc::channel(4);
        let conn = hub.attach(Connection::new(None, tx)).await;
        let receiver = UserId::new();
        registry.register(receiver, conn.id).await;

        // Transport already dropped the socket, registry not yet updated
        hub.detach(&conn.id).await;

        let msg = message(UserId::new(), receiver, "lost");
        assert_eq!(relay.relay(&msg).await, RelayOutcome::Dropped(conn.id));
    }
}
