//! Error types for Duochat

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ChatError::NotFound("row".to_string()),
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation
                if db_err.code().as_deref() == Some("23505") {
                    return ChatError::Conflict(db_err.message().to_string());
                }
                ChatError::Database(db_err.to_string())
            }
            _ => ChatError::Database(err.to_string()),
        }
    }
}

/// Result type alias for store operations
pub type ChatResult<T> = Result<T, ChatError>;
