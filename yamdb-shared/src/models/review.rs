//! Review model and database operations
//!
//! A review scores a title from 1 to 10. Each author may review a given title
//! once; the `unique_review` constraint backs the check the API performs
//! before inserting.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE reviews (
//!     id BIGSERIAL PRIMARY KEY,
//!     title_id BIGINT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
//!     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     text TEXT NOT NULL,
//!     score SMALLINT NOT NULL CHECK (score BETWEEN 1 AND 10),
//!     pub_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT unique_review UNIQUE (title_id, author_id)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Lowest accepted score
pub const MIN_SCORE: i16 = 1;

/// Highest accepted score
pub const MAX_SCORE: i16 = 10;

/// Name of the one-review-per-author-per-title constraint
pub const UNIQUE_REVIEW_CONSTRAINT: &str = "unique_review";

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, r.author_id, u.username AS author, r.text, r.score, r.pub_date
    FROM reviews r
    JOIN users u ON u.id = r.author_id"#;

/// Review joined with its author's username
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,

    pub title_id: i64,

    pub author_id: i64,

    /// Author's username
    pub author: String,

    pub text: String,

    /// Score between [`MIN_SCORE`] and [`MAX_SCORE`]
    pub score: i16,

    pub pub_date: DateTime<Utc>,
}

/// Input for creating a review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReview {
    pub title_id: i64,
    pub author_id: i64,
    pub text: String,
    pub score: i16,
}

/// Input for updating a review; only non-None fields change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReview {
    pub text: Option<String>,
    pub score: Option<i16>,
}

impl Review {
    /// Creates a review
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`UNIQUE_REVIEW_CONSTRAINT`] if the
    /// author already reviewed the title.
    pub async fn create(pool: &PgPool, data: CreateReview) -> Result<Self, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO reviews (title_id, author_id, text, score)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(data.title_id)
        .bind(data.author_id)
        .bind(data.text)
        .bind(data.score)
        .fetch_one(pool)
        .await?;

        tracing::info!(review_id = id, title_id = data.title_id, author_id = data.author_id, "Review created");

        Self::find(pool, data.title_id, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a review of a specific title
    ///
    /// Returns None if the review does not exist or belongs to another title.
    pub async fn find(pool: &PgPool, title_id: i64, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1 AND r.title_id = $2"))
            .bind(id)
            .bind(title_id)
            .fetch_optional(pool)
            .await
    }

    /// Checks whether the author already reviewed the title
    pub async fn exists_for_author(pool: &PgPool, title_id: i64, author_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)")
            .bind(title_id)
            .bind(author_id)
            .fetch_one(pool)
            .await
    }

    /// Lists reviews of a title, newest first
    pub async fn list_by_title(
        pool: &PgPool,
        title_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date DESC, r.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(title_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Counts reviews of a title
    pub async fn count_by_title(pool: &PgPool, title_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(pool)
            .await
    }

    /// Updates a review of a specific title
    ///
    /// # Returns
    ///
    /// The updated review, or None if it does not exist under that title
    pub async fn update(
        pool: &PgPool,
        title_id: i64,
        id: i64,
        data: UpdateReview,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.text.is_some() || data.score.is_some() {
            let mut query = QueryBuilder::<Postgres>::new("UPDATE reviews SET ");
            let mut columns = query.separated(", ");
            if let Some(text) = data.text {
                columns.push("text = ").push_bind_unseparated(text);
            }
            if let Some(score) = data.score {
                columns.push("score = ").push_bind_unseparated(score);
            }
            query
                .push(" WHERE id = ")
                .push_bind(id)
                .push(" AND title_id = ")
                .push_bind(title_id);
            query.build().execute(pool).await?;
        }

        Self::find(pool, title_id, id).await
    }

    /// Deletes a review of a specific title, with its comments
    ///
    /// # Returns
    ///
    /// True if the review was deleted
    pub async fn delete(pool: &PgPool, title_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND title_id = $2")
            .bind(id)
            .bind(title_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
