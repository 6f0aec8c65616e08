//! Access policies and permission checks
//!
//! Every resource is guarded by one [`AccessPolicy`]. The request-level
//! [`AccessPolicy::check`] runs before the handler touches the database; the
//! object-level [`AccessPolicy::check_object`] runs once the target row has
//! been loaded and its author is known.
//!
//! # Permission Model
//!
//! | policy                               | read            | write                           |
//! |--------------------------------------|-----------------|---------------------------------|
//! | `AdminOrReadOnly`                    | anyone          | admin                           |
//! | `AdminModeratorAuthorOrReadOnly`     | anyone          | create: any user; edit: author, moderator, admin |
//! | `AdminOnly`                          | admin           | admin                           |
//!
//! Superusers count as admins whatever their role.
//!
//! # Example
//!
//! ```
//! use axum::http::Method;
//! use yamdb_shared::auth::authorization::{AccessPolicy, AuthzError};
//!
//! // Anonymous readers may list titles but not create them
//! assert!(AccessPolicy::AdminOrReadOnly.check(&Method::GET, None).is_ok());
//! assert!(matches!(
//!     AccessPolicy::AdminOrReadOnly.check(&Method::POST, None),
//!     Err(AuthzError::NotAuthenticated)
//! ));
//! ```

use axum::http::Method;

use super::middleware::AuthContext;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No credentials were supplied for a protected operation
    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    /// Caller's role does not allow the operation
    #[error("You do not have permission to perform this action")]
    InsufficientRole,

    /// Caller is neither the author nor a moderator or admin
    #[error("Only the author, a moderator or an admin can change this object")]
    NotAuthor,
}

/// Permission rule attached to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Reads are public, writes need an admin
    AdminOrReadOnly,

    /// Reads are public, any user may create, edits need the author,
    /// a moderator or an admin
    AdminModeratorAuthorOrReadOnly,

    /// Everything needs an admin
    AdminOnly,
}

/// GET, HEAD and OPTIONS never modify state
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Requires an authenticated caller
pub fn require_authenticated(auth: Option<&AuthContext>) -> Result<&AuthContext, AuthzError> {
    auth.ok_or(AuthzError::NotAuthenticated)
}

impl AccessPolicy {
    /// Request-level check
    pub fn check(&self, method: &Method, auth: Option<&AuthContext>) -> Result<(), AuthzError> {
        match self {
            AccessPolicy::AdminOrReadOnly => {
                if is_safe_method(method) {
                    return Ok(());
                }
                require_admin(auth)
            }
            AccessPolicy::AdminModeratorAuthorOrReadOnly => {
                if is_safe_method(method) {
                    return Ok(());
                }
                require_authenticated(auth).map(|_| ())
            }
            AccessPolicy::AdminOnly => require_admin(auth),
        }
    }

    /// Object-level check against the author of the loaded object
    ///
    /// Only [`AccessPolicy::AdminModeratorAuthorOrReadOnly`] looks at the
    /// author; the other policies defer to [`AccessPolicy::check`].
    pub fn check_object(
        &self,
        method: &Method,
        auth: Option<&AuthContext>,
        author_id: i64,
    ) -> Result<(), AuthzError> {
        match self {
            AccessPolicy::AdminModeratorAuthorOrReadOnly => {
                if is_safe_method(method) {
                    return Ok(());
                }
                let auth = require_authenticated(auth)?;
                if auth.is_admin() || auth.is_moderator() || auth.user_id == author_id {
                    Ok(())
                } else {
                    Err(AuthzError::NotAuthor)
                }
            }
            _ => self.check(method, auth),
        }
    }
}

fn require_admin(auth: Option<&AuthContext>) -> Result<(), AuthzError> {
    let auth = require_authenticated(auth)?;
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole)
    }
}
