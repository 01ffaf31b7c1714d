//! # TaskForge API Server
//!
//! REST API for task management: accounts with JWT authentication, task
//! CRUD with comments and assignment, filtered/paginated queries, and
//! dashboard statistics, with a Redis read-through cache in front of
//! PostgreSQL.
//!
//! ## Startup sequence
//!
//! 1. Initialize tracing.
//! 2. Load and validate configuration from the environment.
//! 3. Connect the database pool (bounded retries, then fatal) and run
//!    migrations.
//! 4. Connect the cache. Unreachable cache: fatal in development or when
//!    `REDIS_REQUIRED=true`, degraded start otherwise.
//! 5. Serve until SIGINT/SIGTERM, then drain and close the pool.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskforge-api
//! ```

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskforge_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskforge_shared::cache::{CacheClient, CacheConfig};
use taskforge_shared::db::{migrations, pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskforge_api=debug,taskforge_shared=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("TaskForge API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = pool::create_pool_with_retry(
        taskforge_shared::db::pool::DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            ..Default::default()
        },
        config.database.connect_attempts,
        Duration::from_secs(config.database.retry_delay_secs),
    )
    .await
    .context("Could not connect to the database")?;

    migrations::run_migrations(&db)
        .await
        .context("Database migration failed")?;

    let cache = connect_cache(&config).await?;

    let state = AppState::new(db.clone(), cache, config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Could not bind {}", config.bind_address()))?;

    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Connects the cache according to the startup policy
///
/// - No `REDIS_URL`: run without a cache.
/// - Connection failure with `REDIS_REQUIRED=true`: fatal.
/// - Connection failure in development: fatal, so misconfiguration is
///   caught at the desk, not in production.
/// - Connection failure in production: degraded start; the cache is
///   advisory.
async fn connect_cache(config: &Config) -> anyhow::Result<CacheClient> {
    if config.redis.url.is_none() {
        tracing::info!("No REDIS_URL configured, running without cache");
        return Ok(CacheClient::disconnected());
    }

    match CacheClient::connect(CacheConfig::from_env()?).await {
        Ok(cache) => Ok(cache),
        Err(e) if config.redis.required => {
            Err(anyhow::Error::from(e).context("Cache is required but unreachable"))
        }
        Err(e) if !config.api.production => {
            Err(anyhow::Error::from(e).context("Cache connection failed"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cache connection failed, continuing without cache");
            Ok(CacheClient::disconnected())
        }
    }
}

/// Resolves when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
