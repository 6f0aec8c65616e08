//! Error handling for the API server
//!
//! Every handler returns [`ApiResult`]; [`ApiError`] renders as a JSON body
//!
//! ```json
//! { "error": "validation_error", "message": "...", "details": [{ "field": "slug", "message": "..." }] }
//! ```
//!
//! # Example
//!
//! ```
//! use yamdb_api::error::{ApiError, ApiResult};
//! use axum::Json;
//! use serde_json::{json, Value};
//!
//! async fn handler(found: bool) -> ApiResult<Json<Value>> {
//!     if !found {
//!         return Err(ApiError::NotFound("Title not found".to_string()));
//!     }
//!     Ok(Json(json!({ "ok": true })))
//! }
//! ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::error::ErrorKind;
use std::fmt;
use yamdb_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError},
    mail::MailError,
    models::{review::UNIQUE_REVIEW_CONSTRAINT, taxonomy::Taxonomy},
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Field-level validation failures (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Missing or invalid credentials (401)
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field errors, for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::InternalError(msg) => {
                // Logged, never shown to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Field error for a unique constraint, by constraint name
fn unique_violation(constraint: &str) -> Option<ValidationErrorDetail> {
    let detail = match constraint {
        "users_username_key" => {
            ValidationErrorDetail::new("username", "A user with that username already exists")
        }
        "users_email_key" => ValidationErrorDetail::new("email", "A user with that email already exists"),
        "unique_title_genre" => ValidationErrorDetail::new("genre", "Genre listed more than once"),
        c if c == UNIQUE_REVIEW_CONSTRAINT => {
            ValidationErrorDetail::new("title", "You have already reviewed this title")
        }
        c if c == Taxonomy::Category.slug_constraint() || c == Taxonomy::Genre.slug_constraint() => {
            ValidationErrorDetail::new("slug", "This slug is already in use")
        }
        _ => return None,
    };
    Some(detail)
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is unavailable".to_string())
            }
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => db_err
                    .constraint()
                    .and_then(unique_violation)
                    .map(|detail| ApiError::ValidationError(vec![detail]))
                    .unwrap_or_else(|| ApiError::BadRequest("Duplicate value".to_string())),
                ErrorKind::ForeignKeyViolation => {
                    ApiError::BadRequest("Referenced object does not exist".to_string())
                }
                ErrorKind::CheckViolation => {
                    ApiError::BadRequest(format!("Value out of range: {}", db_err.message()))
                }
                _ => ApiError::InternalError(format!("Database error: {}", db_err)),
            },
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert derived validation failures to field errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    ValidationErrorDetail::new(
                        field.to_string(),
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", e.code)),
                    )
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

/// Convert authentication errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::UnknownUser => ApiError::Unauthorized("User not found".to_string()),
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAuthenticated => ApiError::Unauthorized(err.to_string()),
            AuthzError::InsufficientRole | AuthzError::NotAuthor => ApiError::Forbidden(err.to_string()),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert mail errors to API errors
impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Address(e) => ApiError::field("email", format!("Invalid email address: {e}")),
            MailError::Transport(e) => {
                tracing::error!(error = %e, "Mail delivery failed");
                ApiError::ServiceUnavailable("Could not send email, try again later".to_string())
            }
            MailError::Build(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Malformed JSON bodies are client errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Non-numeric ids never match a row
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::NotFound(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Title not found".to_string());
        assert_eq!(err.to_string(), "Not found: Title not found");
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::BadRequest(String::new()), StatusCode::BAD_REQUEST),
            (ApiError::field("slug", "taken"), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized(String::new()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden(String::new()), StatusCode::FORBIDDEN),
            (ApiError::NotFound(String::new()), StatusCode::NOT_FOUND),
            (ApiError::InternalError("secret".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::ServiceUnavailable(String::new()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_unique_violation_mapping() {
        assert_eq!(unique_violation("users_email_key").unwrap().field, "email");
        assert_eq!(unique_violation("users_username_key").unwrap().field, "username");
        assert_eq!(unique_violation("genres_slug_key").unwrap().field, "slug");
        assert_eq!(unique_violation("categories_slug_key").unwrap().field, "slug");
        assert_eq!(unique_violation("unique_review").unwrap().field, "title");
        assert!(unique_violation("something_else").is_none());
    }

    #[test]
    fn test_from_validation_errors() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("Too long".into());
        errors.add("name", err);
        errors.add("email", ValidationError::new("email"));

        match ApiError::from(errors) {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[0].message, "Invalid value (email)");
                assert_eq!(details[1], ValidationErrorDetail::new("name", "Too long"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_authz_mapping() {
        assert!(matches!(
            ApiError::from(AuthzError::NotAuthenticated),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(ApiError::from(AuthzError::NotAuthor), ApiError::Forbidden(_)));
        assert!(matches!(
            ApiError::from(AuthzError::InsufficientRole),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn test_auth_errors_render_json_bodies() {
        let cases = [
            (AuthError::InvalidToken("Token expired".to_string()), StatusCode::UNAUTHORIZED, "unauthorized"),
            (AuthError::InvalidFormat("Expected Bearer".to_string()), StatusCode::UNAUTHORIZED, "unauthorized"),
            (AuthError::UnknownUser, StatusCode::UNAUTHORIZED, "unauthorized"),
            (
                AuthError::DatabaseError("connection refused".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (err, status, code) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body.error, code);
            assert!(!body.message.contains("connection refused"));
        }
    }
}
