//! WebSocket connection handle
//!
//! Represents one live WebSocket connection and its bounded outbound queue.

use duochat_shared::{ConnectionId, UserId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::events::ServerEvent;

/// Result of queueing one event for one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the connection's outbound queue
    Queued,
    /// Outbound queue full; the event was dropped
    QueueFull,
    /// Writer task has gone away
    Closed,
    /// No live connection with that id
    Unknown,
}

/// Represents an active WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Unique id for this connection
    pub id: ConnectionId,

    /// Identity resolved at handshake; `None` for anonymous connections
    pub user_id: Option<UserId>,

    /// Channel to send events to this connection
    sender: mpsc::Sender<ServerEvent>,
}

impl Connection {
    /// Create a new connection
    pub fn new(user_id: Option<UserId>, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            sender,
        }
    }

    /// Queue an event without waiting. A full queue drops the new event.
    pub fn send(&self, event: ServerEvent) -> Delivery {
        match self.sender.try_send(event) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    session_id = %self.id,
                    event_type = event.kind(),
                    "Outbound queue full, dropping event"
                );
                Delivery::QueueFull
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
