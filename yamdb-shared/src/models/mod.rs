//! Database models for YaMDb
//!
//! This module contains all database models and their CRUD operations.
//!
//! # Models
//!
//! - `user`: User accounts and roles
//! - `confirmation_code`: Pending one-time signup codes
//! - `taxonomy`: Categories and genres (slug-addressed vocabularies)
//! - `title`: Reviewed works, their genres and derived rating
//! - `review`: Scored reviews, one per author per title
//! - `comment`: Comments on reviews
//!
//! # Example
//!
//! ```no_run
//! use yamdb_shared::models::taxonomy::{CreateTerm, Taxonomy, Term};
//! use yamdb_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let genre = Term::create(&pool, Taxonomy::Genre, CreateTerm {
//!     name: "Drama".to_string(),
//!     slug: "drama".to_string(),
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod comment;
pub mod confirmation_code;
pub mod review;
pub mod taxonomy;
pub mod title;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Builds an `ILIKE` pattern matching `term` anywhere in the column
///
/// `%`, `_` and `\` in the search term are escaped so they match literally.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Deserializes a present field as `Some(value)`
///
/// Paired with `#[serde(default)]` on an `Option<Option<T>>` field this tells
/// an absent field (`None`) apart from an explicit `null` (`Some(None)`).
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
