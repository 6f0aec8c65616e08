//! Categories and genres
//!
//! Both vocabularies have the same shape (a display name plus a unique,
//! URL-safe slug) and the same operations, so they share one model type,
//! [`Term`], parameterised by [`Taxonomy`].
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE categories (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(256) NOT NULL,
//!     slug VARCHAR(50) NOT NULL UNIQUE
//! );
//!
//! CREATE TABLE genres (...same columns...);
//! ```
//!
//! A title points at one category (`ON DELETE SET NULL`) and at any number
//! of genres through `title_genres` (`ON DELETE CASCADE`).

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::like_pattern;

/// Which vocabulary a term belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Category,
    Genre,
}

impl Taxonomy {
    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            Taxonomy::Category => "categories",
            Taxonomy::Genre => "genres",
        }
    }

    /// Name of the unique constraint on `slug`
    pub fn slug_constraint(&self) -> &'static str {
        match self {
            Taxonomy::Category => "categories_slug_key",
            Taxonomy::Genre => "genres_slug_key",
        }
    }

    /// Singular, human-readable name used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Taxonomy::Category => "Category",
            Taxonomy::Genre => "Genre",
        }
    }
}

/// A category or genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Term {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.slug)
    }
}

/// Input for creating a term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTerm {
    pub name: String,
    pub slug: String,
}

impl Term {
    /// Creates a term in the given vocabulary
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`Taxonomy::slug_constraint`] if the
    /// slug is taken.
    pub async fn create(pool: &PgPool, taxonomy: Taxonomy, data: CreateTerm) -> Result<Self, sqlx::Error> {
        let term = sqlx::query_as::<_, Term>(&format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
            taxonomy.table()
        ))
        .bind(data.name)
        .bind(data.slug)
        .fetch_one(pool)
        .await?;

        tracing::info!(taxonomy = taxonomy.table(), slug = %term.slug, "Term created");
        Ok(term)
    }

    /// Finds a term by slug
    pub async fn find_by_slug(pool: &PgPool, taxonomy: Taxonomy, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Term>(&format!(
            "SELECT id, name, slug FROM {} WHERE slug = $1",
            taxonomy.table()
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// Finds all terms whose slug is in `slugs`
    ///
    /// Unknown slugs are silently absent from the result; callers compare
    /// lengths to detect them.
    pub async fn find_by_slugs(pool: &PgPool, taxonomy: Taxonomy, slugs: &[String]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Term>(&format!(
            "SELECT id, name, slug FROM {} WHERE slug = ANY($1) ORDER BY slug",
            taxonomy.table()
        ))
        .bind(slugs)
        .fetch_all(pool)
        .await
    }

    /// Deletes a term by slug
    ///
    /// # Returns
    ///
    /// True if a term was deleted
    pub async fn delete_by_slug(pool: &PgPool, taxonomy: Taxonomy, slug: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE slug = $1", taxonomy.table()))
            .bind(slug)
            .execute(pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::info!(taxonomy = taxonomy.table(), slug, "Term deleted");
        }
        Ok(result.rows_affected() > 0)
    }

    /// Lists terms ordered by slug, optionally filtered by a case-insensitive
    /// name substring
    pub async fn list(
        pool: &PgPool,
        taxonomy: Taxonomy,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, name, slug FROM {} WHERE 1=1",
            taxonomy.table()
        ));
        Self::apply_search(&mut query, search);
        query
            .push(" ORDER BY slug LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Term>().fetch_all(pool).await
    }

    /// Counts terms matching the same filter as [`Term::list`]
    pub async fn count(pool: &PgPool, taxonomy: Taxonomy, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} WHERE 1=1", taxonomy.table()));
        Self::apply_search(&mut query, search);

        query.build_query_scalar::<i64>().fetch_one(pool).await
    }

    fn apply_search(query: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query.push(" AND name ILIKE ").push_bind(like_pattern(term));
        }
    }
}
