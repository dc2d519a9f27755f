//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub active_connections: usize,
    pub online_users: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = state.messages.ping().await.is_ok();
    let stats = state.ws_state.get_stats().await;

    let overall_status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let label = |ok: bool| (if ok { "healthy" } else { "unhealthy" }).to_string();

    (
        overall_status,
        Json(HealthResponse {
            status: label(db_healthy),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: label(db_healthy),
            active_connections: stats.active_connections,
            online_users: stats.online_users,
        }),
    )
}

/// Liveness probe (just returns 200 if the server is running)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe (checks if the service is ready to accept traffic)
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.messages.ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
