//! User model and database operations
//!
//! Users sign up with a username and email only; there is no password. Access is
//! granted by exchanging an emailed confirmation code for a JWT (see
//! [`crate::models::confirmation_code`]).
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE user_role AS ENUM ('user', 'moderator', 'admin');
//!
//! CREATE TABLE users (
//!     id BIGSERIAL PRIMARY KEY,
//!     username VARCHAR(150) NOT NULL UNIQUE,
//!     email VARCHAR(254) NOT NULL UNIQUE,
//!     first_name VARCHAR(150) NOT NULL DEFAULT '',
//!     last_name VARCHAR(150) NOT NULL DEFAULT '',
//!     bio TEXT NOT NULL DEFAULT '',
//!     role user_role NOT NULL DEFAULT 'user',
//!     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use yamdb_shared::models::user::{CreateUser, User, UserRole};
//! use yamdb_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let user = User::create(&pool, CreateUser::new("reader", "reader@example.com")).await?;
//! assert_eq!(user.role, UserRole::User);
//!
//! let found = User::find_by_username(&pool, "reader").await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::like_pattern;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, role, is_superuser, created_at, updated_at";

/// Roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Can publish reviews and comments and edit their own
    #[default]
    User,

    /// Can additionally edit or delete anyone's reviews and comments
    Moderator,

    /// Full access, including vocabularies, titles and user management
    Admin,
}

impl UserRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Public handle, unique across users
    pub username: String,

    /// Email address the confirmation code is sent to, unique across users
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Free-form profile text
    pub bio: String,

    pub role: UserRole,

    /// Superusers are treated as admins regardless of `role`
    pub is_superuser: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Admins and superusers manage users, vocabularies and titles
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin || self.is_superuser
    }

    /// Moderators may edit or delete any review or comment
    pub fn is_moderator(&self) -> bool {
        self.role == UserRole::Moderator
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: UserRole,
}

impl CreateUser {
    /// Minimal self-signup input: plain `user` role, empty profile
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Default::default()
        }
    }
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<UserRole>,
}

impl UpdateUser {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.role.is_none()
    }
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email is already taken
    /// (`users_username_key` / `users_email_key` constraint) or the database
    /// is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, bio, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.username)
        .bind(data.email)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.bio)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by username (exact match)
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (exact match)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Updates the user identified by `username`
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always
    /// refreshed.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if no user has that username
    ///
    /// # Errors
    ///
    /// Returns an error if the new username or email collides with another user
    pub async fn update(
        pool: &PgPool,
        username: &str,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(new_username) = data.username {
            query.push(", username = ").push_bind(new_username);
        }
        if let Some(email) = data.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(first_name) = data.first_name {
            query.push(", first_name = ").push_bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            query.push(", last_name = ").push_bind(last_name);
        }
        if let Some(bio) = data.bio {
            query.push(", bio = ").push_bind(bio);
        }
        if let Some(role) = data.role {
            query.push(", role = ").push_bind(role);
        }

        query
            .push(" WHERE username = ")
            .push_bind(username)
            .push(format!(" RETURNING {USER_COLUMNS}"));

        query.build_query_as::<User>().fetch_optional(pool).await
    }

    /// Deletes a user by username
    ///
    /// Reviews, comments and any pending confirmation code go with it
    /// (`ON DELETE CASCADE`).
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users ordered by username, optionally filtered by a
    /// case-insensitive username substring
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1"));
        Self::apply_search(&mut query, search);
        query
            .push(" ORDER BY username LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<User>().fetch_all(pool).await
    }

    /// Counts users matching the same filter as [`User::list`]
    pub async fn count(pool: &PgPool, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE 1=1");
        Self::apply_search(&mut query, search);

        query.build_query_scalar::<i64>().fetch_one(pool).await
    }

    fn apply_search(query: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query.push(" AND username ILIKE ").push_bind(like_pattern(term));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(role: UserRole, is_superuser: bool) -> User {
        User {
            id: 1,
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role,
            is_superuser,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_helpers() {
        assert!(!user_with(UserRole::User, false).is_admin());
        assert!(!user_with(UserRole::User, false).is_moderator());
        assert!(user_with(UserRole::Moderator, false).is_moderator());
        assert!(!user_with(UserRole::Moderator, false).is_admin());
        assert!(user_with(UserRole::Admin, false).is_admin());
    }

    #[test]
    fn test_superuser_is_admin_whatever_the_role() {
        let user = user_with(UserRole::User, true);
        assert!(user.is_admin());
        assert!(!user.is_moderator());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Moderator).unwrap(), "\"moderator\"");
        let role: UserRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, UserRole::Admin);
        assert!(serde_json::from_str::<UserRole>("\"owner\"").is_err());
    }

    #[test]
    fn test_create_user_defaults() {
        let data = CreateUser::new("reader", "reader@example.com");
        assert_eq!(data.role, UserRole::User);
        assert!(data.bio.is_empty());
    }

    #[test]
    fn test_update_user_is_empty() {
        assert!(UpdateUser::default().is_empty());
        let update = UpdateUser {
            bio: Some("hi".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_display_is_username() {
        assert_eq!(user_with(UserRole::User, false).to_string(), "reader");
    }
}
