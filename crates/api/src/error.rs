//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use duochat_shared::ChatError;
use serde_json::json;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User already exists with this email")]
    EmailAlreadyExists,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Authentication required")]
    Unauthorized,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,
    #[error("Resource already exists")]
    Conflict(String),

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            // Authentication
            ApiError::InvalidCredentials => (StatusCode::BAD_REQUEST, "INVALID_CREDENTIALS", self.to_string()),
            ApiError::EmailAlreadyExists => (StatusCode::BAD_REQUEST, "EMAIL_EXISTS", self.to_string()),
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),

            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),

            // Resources
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),

            // Internal
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", "Database error".to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotFound(_) => ApiError::NotFound,
            ChatError::Conflict(msg) => ApiError::Conflict(msg),
            ChatError::Validation(msg) => ApiError::Validation(msg),
            ChatError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ApiError::Database(msg)
            }
            ChatError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound.parts().0, StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Validation("bad".to_string()).parts(),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "bad".to_string())
        );
    }

    #[test]
    fn test_database_details_are_hidden() {
        let (status, code, message) = ApiError::Database("relation missing".to_string()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "DATABASE_ERROR");
        assert_eq!(message, "Database error");
    }

    #[test]
    fn test_from_chat_error() {
        assert!(matches!(
            ApiError::from(ChatError::Conflict("dup".to_string())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::NotFound("user".to_string())),
            ApiError::NotFound
        ));
    }
}
