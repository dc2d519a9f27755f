use anyhow::Context;
use duochat_api::{routes::create_router, AppState, Config};
use duochat_shared::{create_pool, run_migrations, PgStore};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("duochat_api=debug,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    let bind_address = config.bind_address.clone();

    let state = match config.database_url.clone() {
        Some(url) => {
            let pool = create_pool(&url, config.database_max_connections)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool).await.context("failed to run migrations")?;
            tracing::info!("Using Postgres store");
            AppState::with_postgres(config, PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            AppState::in_memory(config)
        }
    };

    let app = create_router(state);
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    tracing::info!(address = %bind_address, "Duochat API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
