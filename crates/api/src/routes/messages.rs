//! Direct message routes

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use duochat_shared::{Message, NewMessage, User, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: String,
    /// URL returned by the blob service
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SidebarResponse {
    pub message: &'static str,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUsersResponse {
    pub user_ids: Vec<UserId>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Everyone except the caller
pub async fn sidebar_users(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<SidebarResponse>> {
    let users = state.users.list_users_except(auth_user.user.id).await?;

    Ok(Json(SidebarResponse {
        message: "Users fetched successfully",
        users,
    }))
}

/// Conversation between the caller and another user, oldest first
pub async fn conversation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(other_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state
        .messages
        .conversation(auth_user.user.id, UserId(other_id))
        .await?;

    Ok(Json(messages))
}

/// Persist a message, then hand it to the relay
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(receiver_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let receiver_id = UserId(receiver_id);

    let new_message = NewMessage {
        sender_id: auth_user.user.id,
        receiver_id,
        text: req.text,
        image_url: req.image_url.filter(|url| !url.trim().is_empty()),
    };
    if new_message.is_empty() {
        return Err(ApiError::Validation(
            "A message needs text or an image".to_string(),
        ));
    }

    if state.users.find_user(receiver_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let message = state.messages.save_message(new_message).await?;
    let outcome = state.ws_state.on_message_persisted(&message).await;

    tracing::info!(
        message_id = %message.id,
        sender_id = %message.sender_id,
        receiver_id = %message.receiver_id,
        relay = ?outcome,
        "Message sent"
    );

    Ok((StatusCode::CREATED, Json(message)))
}

/// Users with a live connection right now
pub async fn online_users(State(state): State<AppState>) -> Json<OnlineUsersResponse> {
    let user_ids = state.ws_state.current_online_users().await.into_iter().collect();
    Json(OnlineUsersResponse { user_ids })
}
