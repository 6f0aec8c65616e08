//! # YaMDb Fixture Loader
//!
//! Loads fixture files into an empty database. Running it against a
//! database that already has data is a no-op.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/yamdb cargo run -p yamdb-loader -- --fixtures static/data
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yamdb_loader::{
    fixtures::Fixtures,
    loader::{load, LoadOutcome},
};
use yamdb_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool::{create_pool, DatabaseConfig},
};

#[derive(Debug, Parser)]
#[command(name = "yamdb-loader", version, about = "Load YaMDb fixtures into an empty database")]
struct Args {
    /// Directory holding the fixture JSON files
    #[arg(short, long, default_value = "static/data")]
    fixtures: PathBuf,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Create the database and apply migrations before loading
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yamdb_loader=info,yamdb_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("YaMDb Loader v{} starting...", env!("CARGO_PKG_VERSION"));

    let fixtures = Fixtures::read_dir(&args.fixtures)
        .with_context(|| format!("Failed to read fixtures from {}", args.fixtures.display()))?;
    tracing::info!(records = fixtures.len(), "Fixtures read");

    if args.migrate {
        ensure_database_exists(&args.database_url)
            .await
            .context("Failed to create database")?;
    }

    let pool = create_pool(DatabaseConfig::new(args.database_url.clone()))
        .await
        .context("Failed to connect to database")?;

    if args.migrate {
        run_migrations(&pool).await.context("Failed to run migrations")?;
    }

    let outcome = load(&pool, &fixtures).await;
    pool.close().await;

    match outcome.context("Failed to load fixtures")? {
        LoadOutcome::AlreadyPopulated { table } => {
            tracing::warn!(table, "Database is not empty, skipped loading");
        }
        LoadOutcome::Loaded { records } => {
            tracing::info!(records, "Done");
        }
    }

    Ok(())
}
