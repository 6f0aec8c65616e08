//! Pending confirmation codes
//!
//! A user has at most one pending code. Issuing a new code replaces the old
//! one, and a successful exchange deletes it, so every code works once.
//! Only the SHA-256 hash of the code is stored (see
//! [`crate::auth::confirmation_code`]).
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE confirmation_codes (
//!     user_id BIGINT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
//!     code_hash VARCHAR(64) NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A pending confirmation code
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConfirmationCode {
    /// Owner of the code
    pub user_id: i64,

    /// Hex-encoded SHA-256 of the plaintext code
    pub code_hash: String,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

impl ConfirmationCode {
    /// True once `expires_at` has passed
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Stores a new code for the user, replacing any pending one
    pub async fn issue(
        pool: &PgPool,
        user_id: i64,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let code = sqlx::query_as::<_, ConfirmationCode>(
            r#"
            INSERT INTO confirmation_codes (user_id, code_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET code_hash = EXCLUDED.code_hash,
                created_at = NOW(),
                expires_at = EXCLUDED.expires_at
            RETURNING user_id, code_hash, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        tracing::debug!(user_id, expires_at = %code.expires_at, "Confirmation code issued");
        Ok(code)
    }

    /// Finds the pending code for a user, expired or not
    pub async fn find_by_user(pool: &PgPool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ConfirmationCode>(
            r#"
            SELECT user_id, code_hash, created_at, expires_at
            FROM confirmation_codes
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Consumes the user's code if it matches and has not expired
    ///
    /// Match and deletion happen in a single statement, so two concurrent
    /// exchanges of the same code cannot both succeed.
    ///
    /// # Returns
    ///
    /// True if the code was valid and is now spent
    pub async fn consume(pool: &PgPool, user_id: i64, code_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM confirmation_codes
            WHERE user_id = $1 AND code_hash = $2 AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes expired codes, returning how many were deleted
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM confirmation_codes WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
