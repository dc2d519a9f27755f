//! Application configuration

use std::env;

use crate::websocket::MIN_OUTBOUND_QUEUE_CAPACITY;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub client_origin: String,

    // Database
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Authentication
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub cookie_secure: bool,

    // Realtime
    pub ws_outbound_queue_capacity: usize,
    pub trust_claimed_identity: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5001".to_string()),
            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            // Database (in-memory store when unset)
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Authentication
            jwt_secret: {
                let secret =
                    env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            jwt_expiry_days: env::var("JWT_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            cookie_secure: env::var("COOKIE_SECURE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            // Realtime
            ws_outbound_queue_capacity: {
                let capacity: usize = env::var("WS_OUTBOUND_QUEUE_CAPACITY")
                    .unwrap_or_else(|_| "64".to_string())
                    .parse()
                    .map_err(|_| ConfigError::Invalid("WS_OUTBOUND_QUEUE_CAPACITY must be a number"))?;
                if capacity < MIN_OUTBOUND_QUEUE_CAPACITY {
                    return Err(ConfigError::Invalid(
                        "WS_OUTBOUND_QUEUE_CAPACITY must be at least 2",
                    ));
                }
                capacity
            },
            trust_claimed_identity: env::var("TRUST_CLAIMED_IDENTITY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (they modify shared env vars)
    static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "JWT_SECRET",
        "DATABASE_URL",
        "WS_OUTBOUND_QUEUE_CAPACITY",
        "TRUST_CLAIMED_IDENTITY",
        "COOKIE_SECURE",
    ];

    fn cleanup_config() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_config_validation() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        // === Missing secret ===
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));

        // === Short secret ===
        env::set_var("JWT_SECRET", "short");
        assert!(matches!(Config::from_env(), Err(ConfigError::WeakSecret(_))));

        // === Defaults ===
        env::set_var(
            "JWT_SECRET",
            "test-jwt-secret-must-be-at-least-32-characters-long",
        );
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:5001");
        assert!(config.database_url.is_none());
        assert_eq!(config.ws_outbound_queue_capacity, 64);
        assert!(!config.trust_claimed_identity);
        assert!(!config.cookie_secure);

        // === Queue too small for the opening ack and roster ===
        env::set_var("WS_OUTBOUND_QUEUE_CAPACITY", "0");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));
        env::set_var("WS_OUTBOUND_QUEUE_CAPACITY", "1");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));

        // === Overrides ===
        env::set_var("WS_OUTBOUND_QUEUE_CAPACITY", "8");
        env::set_var("TRUST_CLAIMED_IDENTITY", "true");
        env::set_var("DATABASE_URL", "postgres://localhost/duochat");
        let config = Config::from_env().unwrap();
        assert_eq!(config.ws_outbound_queue_capacity, 8);
        assert!(config.trust_claimed_identity);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/duochat")
        );

        cleanup_config();
    }
}
