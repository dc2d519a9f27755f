//! WebSocket handler for Axum
//!
//! Resolves the handshake identity, then runs one connection from open to
//! close: a writer task drains the outbound queue while this task reads.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use duochat_shared::UserId;
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::{token_from_headers, JwtManager};
use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
};

#[derive(Debug, Default, Deserialize)]
pub struct WebSocketQuery {
    /// Identity the client claims
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// Session token, for clients that cannot send the cookie
    pub token: Option<String>,
}

/// Work out who is on the other end of a new connection.
///
/// A valid session token always wins. A bare `userId` claim is only
/// believed when `trust_claimed` is set. Everything else is anonymous.
pub fn resolve_identity(
    jwt: &JwtManager,
    trust_claimed: bool,
    claimed: Option<&str>,
    token: Option<&str>,
) -> Option<UserId> {
    if let Some(token) = token {
        match jwt.validate_token(token) {
            Ok(claims) => {
                let verified = claims.user_id();
                if let Some(claimed) = claimed {
                    if claimed.parse::<UserId>().ok() != Some(verified) {
                        tracing::warn!(
                            claimed = %claimed,
                            user_id = %verified,
                            "Handshake claim does not match session, using session identity"
                        );
                    }
                }
                return Some(verified);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Handshake carried an invalid session token");
            }
        }
    }

    let claimed = claimed.filter(|c| !c.trim().is_empty())?;
    if !trust_claimed {
        tracing::warn!(claimed = %claimed, "Unverified identity claim ignored");
        return None;
    }

    match claimed.parse::<UserId>() {
        Ok(user_id) => Some(user_id),
        Err(_) => {
            tracing::warn!(claimed = %claimed, "Unparseable identity claim, treating as anonymous");
            None
        }
    }
}

/// WebSocket handler - upgrades HTTP connection to WebSocket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(params): Query<WebSocketQuery>,
    headers: HeaderMap,
) -> Response {
    let token = params.token.clone().or_else(|| token_from_headers(&headers));
    let user_id = resolve_identity(
        &app_state.jwt,
        app_state.config.trust_claimed_identity,
        params.user_id.as_deref(),
        token.as_deref(),
    );

    tracing::info!(
        user_id = ?user_id,
        "WebSocket connection upgrade requested"
    );

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, app_state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Option<UserId>, app_state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let ws_state = app_state.ws_state;

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(ws_state.outbound_queue_capacity);
    let conn = ws_state.hub.attach(Connection::new(user_id, tx)).await;
    let session_id = conn.id;

    // Spawn task to send messages to client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Send connection acknowledgment
    conn.send(ServerEvent::Connected { session_id });

    ws_state.on_connection_opened(session_id, user_id).await;

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = ?e, "WebSocket read failed");
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::Ping) => {
                    conn.send(ServerEvent::Pong);
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        error = ?e,
                        "Failed to parse client event"
                    );
                    conn.send(ServerEvent::Error {
                        message: "Invalid event format".to_string(),
                    });
                }
            },
            Message::Close(_) => {
                tracing::info!(session_id = %session_id, "WebSocket close frame received");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Axum handles ping/pong automatically
            }
            Message::Binary(_) => {}
        }
    }

    // Cleanup on disconnect
    tracing::info!(session_id = %session_id, user_id = ?user_id, "WebSocket connection closing");
    ws_state.hub.detach(&session_id).await;
    ws_state.on_connection_closed(session_id).await;

    send_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-chars!";

    #[test]
    fn test_token_identity_wins_over_claim() {
        let jwt = JwtManager::new(SECRET, 7);
        let real = UserId::new();
        let token = jwt.generate_session_token(real).unwrap();
        let other = UserId::new().to_string();

        assert_eq!(
            resolve_identity(&jwt, true, Some(&other), Some(&token)),
            Some(real)
        );
    }

    #[test]
    fn test_claim_requires_trust() {
        let jwt = JwtManager::new(SECRET, 7);
        let claimed = UserId::new();
        let claimed_str = claimed.to_string();

        assert_eq!(resolve_identity(&jwt, false, Some(&claimed_str), None), None);
        assert_eq!(
            resolve_identity(&jwt, true, Some(&claimed_str), None),
            Some(claimed)
        );
    }

    #[test]
    fn test_malformed_handshake_is_anonymous() {
        let jwt = JwtManager::new(SECRET, 7);

        assert_eq!(resolve_identity(&jwt, true, Some("undefined"), None), None);
        assert_eq!(resolve_identity(&jwt, true, Some("  "), None), None);
        assert_eq!(resolve_identity(&jwt, true, None, None), None);
        assert_eq!(resolve_identity(&jwt, false, None, Some("garbage")), None);
    }

    #[test]
    fn test_invalid_token_falls_back_to_trusted_claim() {
        let jwt = JwtManager::new(SECRET, 7);
        let claimed = UserId::new();
        let claimed_str = claimed.to_string();

        assert_eq!(
            resolve_identity(&jwt, true, Some(&claimed_str), Some("garbage")),
            Some(claimed)
        );
    }

    #[test]
    fn test_query_parsing() {
        let query: WebSocketQuery =
            serde_json::from_str(r#"{"userId":"abc","token":"t"}"#).unwrap();
        assert_eq!(query.user_id.as_deref(), Some("abc"));
        assert_eq!(query.token.as_deref(), Some("t"));
    }
}
