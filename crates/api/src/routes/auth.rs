//! Signup, login and session routes

use axum::{
    extract::{Extension, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use duochat_shared::{ChatError, NewUser, User};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{hash_password, validate_password_strength, verify_password, AuthUser, SESSION_COOKIE},
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// =============================================================================
// Cookies
// =============================================================================

fn session_cookie(state: &AppState, token: &str) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        state.jwt.expiry_seconds()
    );
    if state.config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cleared_cookie(state: &AppState) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0");
    if state.config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn issue_session(state: &AppState, user: &User) -> ApiResult<String> {
    let token = state.jwt.generate_session_token(user.id).map_err(|e| {
        tracing::error!(error = %e, user_id = %user.id, "Failed to issue session token");
        ApiError::Internal
    })?;
    Ok(session_cookie(state, &token))
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and start a session
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let full_name = req.full_name.trim();
    let email = req.email.trim();

    if full_name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Please fill all the fields".to_string()));
    }
    validate_password_strength(&req.password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "signup: Failed to hash password");
        ApiError::Internal
    })?;

    let user = state
        .users
        .create_user(NewUser {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await
        .map_err(|e| match e {
            ChatError::Conflict(_) => ApiError::EmailAlreadyExists,
            other => other.into(),
        })?;

    let cookie = issue_session(&state, &user)?;
    tracing::info!(user_id = %user.id, "signup: User created");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse {
            message: "User created successfully",
            user,
        }),
    ))
}

/// Check credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".to_string()));
    }

    let credentials = state
        .users
        .find_credentials_by_email(req.email.trim())
        .await?
        .ok_or_else(|| {
            tracing::warn!(email = %req.email, "login: User not found");
            ApiError::InvalidCredentials
        })?;

    let matches = verify_password(&req.password, &credentials.password_hash).map_err(|e| {
        tracing::error!(error = %e, user_id = %credentials.user.id, "login: Stored hash unreadable");
        ApiError::Internal
    })?;
    if !matches {
        tracing::warn!(user_id = %credentials.user.id, "login: Wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let user = credentials.user;
    let cookie = issue_session(&state, &user)?;
    tracing::info!(user_id = %user.id, "login: Session started");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse {
            message: "Login successful",
            user,
        }),
    ))
}

/// End the session by expiring the cookie
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cleared_cookie(&state))],
        Json(MessageResponse {
            message: "User logged out successfully",
        }),
    )
}

/// Return the authenticated user
pub async fn check(Extension(auth_user): Extension<AuthUser>) -> Json<User> {
    Json(auth_user.user)
}

/// Store the URL of an already-uploaded profile picture
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let profile_pic = req
        .profile_pic
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("Please provide a profile picture".to_string()))?;

    let user = state
        .users
        .update_profile_pic(auth_user.user.id, profile_pic)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(UserResponse {
        message: "Profile updated successfully",
        user,
    }))
}
