//! Bearer authentication for Axum
//!
//! Extracts a JWT from the `Authorization: Bearer <token>` header, validates
//! it and loads the user it names. The resulting [`AuthContext`] is placed in
//! the request extensions; handlers read it with
//! `Option<Extension<AuthContext>>` so public routes still work anonymously.
//!
//! # Example
//!
//! ```no_run
//! use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
//! use yamdb_shared::auth::middleware::{authenticate, bearer_token};
//! use sqlx::PgPool;
//!
//! async fn optional_auth(pool: PgPool, mut req: Request, next: Next) -> Result<Response, StatusCode> {
//!     let token = bearer_token(req.headers()).map_err(|_| StatusCode::UNAUTHORIZED)?;
//!     if let Some(token) = token {
//!         let auth = authenticate(&pool, "secret-key-of-at-least-32-bytes!", token)
//!             .await
//!             .map_err(|_| StatusCode::UNAUTHORIZED)?;
//!         req.extensions_mut().insert(auth);
//!     }
//!     Ok(next.run(req).await)
//! }
//! ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::jwt::{validate_token, JwtError};
use crate::models::user::{User, UserRole};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
    pub is_superuser: bool,
}

impl AuthContext {
    /// Builds the context from a freshly loaded user
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            is_superuser: user.is_superuser,
        }
    }

    /// Admin role or superuser
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin || self.is_superuser
    }

    /// Moderator role
    pub fn is_moderator(&self) -> bool {
        self.role == UserRole::Moderator
    }
}

/// Error type for bearer authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authorization header is present but not a bearer token
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token names a user that no longer exists
    #[error("User not found")]
    UnknownUser,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Extracts the bearer token, if any
///
/// # Returns
///
/// `Ok(None)` when there is no Authorization header at all
///
/// # Errors
///
/// `AuthError::InvalidFormat` if the header is not `Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates a token and loads the caller
///
/// The user is re-read on every call so role changes and deletions apply
/// immediately.
pub async fn authenticate(pool: &PgPool, secret: &str, token: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    let user_id = claims
        .user_id()
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    let user = User::find_by_id(pool, user_id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    tracing::debug!(user_id, username = %user.username, "Request authenticated");
    Ok(AuthContext::from_user(&user))
}
