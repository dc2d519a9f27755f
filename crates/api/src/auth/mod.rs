//! Authentication module for Duochat

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtError, JwtManager};
pub use middleware::{require_auth, token_from_headers, AuthUser, SESSION_COOKIE};
pub use password::{hash_password, validate_password_strength, verify_password};
