//! API route handlers
//!
//! One module per resource:
//!
//! - `health`: Liveness and database connectivity
//! - `auth`: Signup and token exchange
//! - `users`: User administration and the caller's own profile
//! - `taxonomy`: Categories and genres
//! - `titles`: Titles with filtering and derived rating
//! - `reviews`: Reviews of a title
//! - `comments`: Comments on a review

pub mod auth;
pub mod comments;
pub mod health;
pub mod reviews;
pub mod taxonomy;
pub mod titles;
pub mod users;

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use yamdb_shared::auth::middleware::AuthContext;

use crate::error::ApiError;

/// The authenticated caller, if the request carried a valid token
///
/// Filled from the extensions the authentication middleware sets; never
/// rejects, so anonymous requests reach the handler and the access policy
/// decides.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<AuthContext>);

impl Caller {
    pub fn auth(&self) -> Option<&AuthContext> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(parts.extensions.get::<AuthContext>().cloned()))
    }
}

/// Path parameters whose parse failure means "no such resource"
///
/// `/titles/abc` answers 404 like `/titles/999` would, in the JSON error
/// format.
#[derive(Debug, Clone, Copy)]
pub struct ResourcePath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ResourcePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ResourcePath(value))
    }
}
