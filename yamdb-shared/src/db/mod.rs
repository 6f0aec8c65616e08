//! Database layer
//!
//! - [`pool`]: PostgreSQL connection pool with a startup health check
//! - [`migrations`]: Embedded schema migrations and status reporting
//!
//! Models and their queries live in [`crate::models`].
//!
//! # Example
//!
//! ```no_run
//! use yamdb_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
//!     run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod migrations;
pub mod pool;
