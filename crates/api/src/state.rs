//! Shared application state

use std::sync::Arc;

use duochat_shared::{MemoryStore, MessageStore, PgStore, UserDirectory};

use crate::{auth::JwtManager, config::Config, websocket::WebSocketState};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserDirectory>,
    pub messages: Arc<dyn MessageStore>,
    pub jwt: JwtManager,
    pub ws_state: WebSocketState,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserDirectory>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_expiry_days);
        let ws_state = WebSocketState::new(config.ws_outbound_queue_capacity);

        Self {
            config: Arc::new(config),
            users,
            messages,
            jwt,
            ws_state,
        }
    }

    /// State backed by Postgres
    pub fn with_postgres(config: Config, store: PgStore) -> Self {
        let store = Arc::new(store);
        Self::new(config, store.clone(), store)
    }

    /// State backed by process memory; nothing survives a restart
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }
}
