//! Duochat API Library
//!
//! This crate contains the HTTP and WebSocket server components for Duochat.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
