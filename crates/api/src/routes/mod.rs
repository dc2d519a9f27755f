//! API routes

pub mod auth;
pub mod health;
pub mod messages;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::require_auth, state::AppState, websocket::ws_handler};

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(origin = %origin, error = %e, "Invalid CLIENT_ORIGIN, CORS disabled");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Public API routes (no auth required)
    let public_api_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    // Protected API routes (auth required)
    let protected_api_routes = Router::new()
        .route("/auth/check", get(auth::check))
        .route("/auth/update-profile", put(auth::update_profile))
        .route("/messages/users", get(messages::sidebar_users))
        .route("/messages/:id", get(messages::conversation))
        .route("/messages/send/:id", post(messages::send_message))
        .route("/online-users", get(messages::online_users))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // WebSocket routes (identity resolved in the handler)
    let websocket_routes = Router::new().route("/ws", get(ws_handler));

    let api_routes = Router::new()
        .merge(public_api_routes)
        .merge(protected_api_routes)
        .merge(websocket_routes);

    let router = Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        // Inline images arrive as URLs, so bodies stay small
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http());

    let router = match cors_layer(&state.config.client_origin) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}
