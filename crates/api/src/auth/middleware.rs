//! Session authentication middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use duochat_shared::User;

use crate::{error::ApiError, state::AppState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "jwt";

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Pull the session token from the `jwt` cookie, else from a Bearer header
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Reject requests without a valid session for an existing user
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(request.headers()).ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt.validate_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "Session token rejected");
        ApiError::InvalidToken
    })?;

    let user = state
        .users
        .find_user(claims.user_id())
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %claims.sub, "Session token for unknown user");
            ApiError::Unauthorized
        })?;

    request.extensions_mut().insert(AuthUser { user });
    Ok(next.run(request).await)
}
