//! # YaMDb Fixture Loader
//!
//! Seeds a fresh YaMDb database with users, vocabularies, titles, reviews
//! and comments read from a directory of JSON files.
//!
//! ## Modules
//!
//! - `fixtures`: Fixture file formats and reading
//! - `loader`: Validation and the transactional load
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use yamdb_loader::{fixtures::Fixtures, loader::load};
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let fixtures = Fixtures::read_dir(Path::new("static/data"))?;
//! let outcome = load(&pool, &fixtures).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod loader;
