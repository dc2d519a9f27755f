//! WebSocket event types and serialization
//!
//! Defines all client-to-server and server-to-client event types
//! with type-safe serde serialization.

use duochat_shared::{ConnectionId, Message, UserId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Heartbeat ping to keep connection alive
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected {
        #[serde(rename = "sessionId")]
        session_id: ConnectionId,
    },

    /// The set of online users changed
    OnlineRosterChanged {
        #[serde(rename = "userIds")]
        user_ids: Vec<UserId>,
    },

    /// A direct message addressed to this connection's user
    MessageReceived(MessagePayload),

    /// Heartbeat response
    Pong,

    /// Error message
    Error { message: String },
}

impl ServerEvent {
    /// Short name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::OnlineRosterChanged { .. } => "online-roster-changed",
            ServerEvent::MessageReceived(_) => "message-received",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
        }
    }
}

// =============================================================================
// Event Data Structures
// =============================================================================

/// Message event data
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: Uuid,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            text: message.text.clone(),
            image_url: message.image_url.clone(),
            created_at: message.created_at,
        }
    }
}
