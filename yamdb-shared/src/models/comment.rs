//! Comment model and database operations
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE comments (
//!     id BIGSERIAL PRIMARY KEY,
//!     review_id BIGINT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
//!     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     text TEXT NOT NULL,
//!     pub_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date
    FROM comments c
    JOIN users u ON u.id = c.author_id"#;

/// Comment joined with its author's username
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub review_id: i64,
    pub author_id: i64,
    pub text: String,
}

impl Comment {
    /// Creates a comment on a review
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO comments (review_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(data.review_id)
        .bind(data.author_id)
        .bind(data.text)
        .fetch_one(pool)
        .await?;

        tracing::info!(comment_id = id, review_id = data.review_id, author_id = data.author_id, "Comment created");

        Self::find(pool, data.review_id, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a comment on a specific review
    pub async fn find(pool: &PgPool, review_id: i64, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1 AND c.review_id = $2"))
            .bind(id)
            .bind(review_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists comments on a review, oldest first
    pub async fn list_by_review(
        pool: &PgPool,
        review_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date, c.id LIMIT $2 OFFSET $3"
        ))
        .bind(review_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Counts comments on a review
    pub async fn count_by_review(pool: &PgPool, review_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(pool)
            .await
    }

    /// Replaces the text of a comment
    ///
    /// # Returns
    ///
    /// The updated comment, or None if it does not exist on that review
    pub async fn update_text(
        pool: &PgPool,
        review_id: i64,
        id: i64,
        text: String,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query("UPDATE comments SET text = $1 WHERE id = $2 AND review_id = $3")
            .bind(text)
            .bind(id)
            .bind(review_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find(pool, review_id, id).await
    }

    /// Deletes a comment on a specific review
    ///
    /// # Returns
    ///
    /// True if the comment was deleted
    pub async fn delete(pool: &PgPool, review_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND review_id = $2")
            .bind(id)
            .bind(review_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
