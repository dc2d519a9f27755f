//! Connection lifecycle
//!
//! Drives each connection through `Connecting -> Established -> Closed`,
//! keeping the registry and the online roster in step with it.

use std::collections::HashMap;
use std::sync::Arc;

use duochat_shared::{ConnectionId, UserId};
use tokio::sync::RwLock;

use super::presence::PresenceBroadcaster;
use super::registry::ConnectionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Established,
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    user_id: Option<UserId>,
    phase: ConnectionPhase,
}

/// Handles connection open/close on behalf of the transport
pub struct LifecycleManager {
    registry: Arc<ConnectionRegistry>,
    presence: PresenceBroadcaster,
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl LifecycleManager {
    pub fn new(registry: Arc<ConnectionRegistry>, presence: PresenceBroadcaster) -> Self {
        Self {
            registry,
            presence,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// A transport connection finished its handshake.
    ///
    /// With an identity the user is registered and the roster goes out to
    /// everyone. Without one the connection stays anonymous and only gets
    /// the current roster itself.
    pub async fn on_connection_opened(&self, connection_id: ConnectionId, user_id: Option<UserId>) {
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&connection_id) {
                tracing::warn!(session_id = %connection_id, "Connection opened twice, ignoring");
                return;
            }
            sessions.insert(
                connection_id,
                Session {
                    user_id,
                    phase: ConnectionPhase::Connecting,
                },
            );
        }

        match user_id {
            Some(user_id) => {
                self.registry.register(user_id, connection_id).await;
                tracing::info!(
                    session_id = %connection_id,
                    user_id = %user_id,
                    "User connected"
                );
                self.presence.announce().await;
            }
            None => {
                tracing::info!(session_id = %connection_id, "Anonymous connection established");
                self.presence.announce_to(connection_id).await;
            }
        }

        if let Some(session) = self.sessions.write().await.get_mut(&connection_id) {
            session.phase = ConnectionPhase::Established;
        }
    }

    /// The transport connection went away, for whatever reason.
    ///
    /// Idempotent: returns `false` when the connection was unknown or
    /// already closed.
    pub async fn on_connection_closed(&self, connection_id: ConnectionId) -> bool {
        let Some(session) = self.sessions.write().await.remove(&connection_id) else {
            return false;
        };

        if let Some(user_id) = session.user_id {
            let removed = self.registry.unregister(user_id, connection_id).await;
            tracing::info!(
                session_id = %connection_id,
                user_id = %user_id,
                removed_entry = removed,
                "User disconnected"
            );
            // Even a stale disconnect re-announces; clients converge on the latest roster
            self.presence.announce().await;
        } else {
            tracing::info!(session_id = %connection_id, "Anonymous connection closed");
        }

        true
    }

    /// Current phase of a connection; anything not tracked is `Closed`
    pub async fn phase(&self, connection_id: ConnectionId) -> ConnectionPhase {
        self.sessions
            .read()
            .await
            .get(&connection_id)
            .map(|s| s.phase)
            .unwrap_or(ConnectionPhase::Closed)
    }

    /// Identity bound to a connection at handshake
    pub async fn identity_of(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.sessions
            .read()
            .await
            .get(&connection_id)
            .and_then(|s| s.user_id)
    }
}
