use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use greenbuild_quotes::cache::{start_cache_warmer, AppCache};
use greenbuild_quotes::config::AppConfig;
use greenbuild_quotes::quotes::{MemoryQuoteStore, PgQuoteStore, QuoteStore};
use greenbuild_quotes::{app, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    telemetry::init(&config.telemetry).context("initialising tracing")?;

    let store: Arc<dyn QuoteStore> = match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(url)
                .await
                .context("connecting to database")?;

            if config.database.run_migrations {
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("running migrations")?;
                info!("Database migrations applied");
            }

            Arc::new(PgQuoteStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory quote store");
            Arc::new(MemoryQuoteStore::new())
        }
    };

    let cache = AppCache::new(&config.cache);
    tokio::spawn(start_cache_warmer(
        cache.clone(),
        Arc::clone(&store),
        config.cache.refresh_interval,
    ));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app(AppState::new(store, cache)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
