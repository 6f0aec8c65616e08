//! # YaMDb API Server
//!
//! Serves the review API described in [`yamdb_api::app`].
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/yamdb JWT_SECRET=... cargo run -p yamdb-api
//! ```
//!
//! Set `LOG_FORMAT=json` for structured logs.

use anyhow::Context;
use axum::{extract::Request, ServiceExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yamdb_api::{
    app::{build_service, AppState},
    config::Config,
};
use yamdb_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    mail::mailer_from_env,
    models::confirmation_code::ConfirmationCode,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("YaMDb API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Invalid configuration")?;

    let db_config = DatabaseConfig::new(config.database.url.clone())
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(db_config).await.context("Failed to connect to database")?;

    if config.database.run_migrations {
        run_migrations(&pool).await.context("Failed to run migrations")?;
    }

    let purged = ConfirmationCode::purge_expired(&pool).await?;
    if purged > 0 {
        tracing::info!(purged, "Removed expired confirmation codes");
    }

    let mailer = mailer_from_env().context("Invalid mail configuration")?;

    let address = config.bind_address();
    let app = build_service(AppState::new(pool.clone(), config, mailer));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "yamdb_api=debug,yamdb_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
