//! # BookVault API Server
//!
//! Serves the BookVault HTTP API: registration, login, token issuance and
//! per-principal book management.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p bookvault-api -- --port 8080
//! ```

use std::sync::Arc;

use anyhow::Context;
use bookvault_api::{
    app::{build_router, AppState},
    config::{Cli, Config},
};
use bookvault_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::{memory::MemoryStore, postgres::PgStore},
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before anything reads the environment
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_overrides(&cli);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        auth_enabled = config.auth.enabled,
        "BookVault API Server starting..."
    );

    let mut pool = None;
    let state = match config.database.clone() {
        Some(database) => {
            let pg = create_pool(DatabaseConfig {
                url: database.url,
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to PostgreSQL")?;
            run_migrations(&pg).await.context("Failed to run migrations")?;

            tracing::info!("Using PostgreSQL store");
            pool = Some(pg.clone());
            AppState::new(Arc::new(PgStore::new(pg)), config)?
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on exit)");
            AppState::new(Arc::new(MemoryStore::new()), config)?
        }
    };

    let address = state.config.bind_address();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookvault_api=debug,bookvault_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

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
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
