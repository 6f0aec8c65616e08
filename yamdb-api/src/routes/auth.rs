//! Authentication endpoints
//!
//! There are no passwords. A user signs up with a username and an email,
//! receives a one-time confirmation code by mail and exchanges it for an
//! access token.
//!
//! # Endpoints
//!
//! - `POST /api/v1/auth/signup` - Register (or re-request a code)
//! - `POST /api/v1/auth/token` - Exchange a confirmation code for a JWT

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_shared::{
    auth::{confirmation_code, jwt},
    mail::confirmation_email,
    models::{
        confirmation_code::ConfirmationCode,
        user::{CreateUser, User},
    },
    validation::{validate_username, with_checks},
};

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: String,
}

/// Signup response; echoes the accepted identity
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub email: String,
    pub username: String,
}

/// Token request
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required"))]
    pub confirmation_code: String,
}

/// Token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access: String,
}

/// Sign up, or ask for a fresh code
///
/// ```text
/// POST /api/v1/auth/signup
///
/// { "email": "reader@example.com", "username": "reader" }
/// ```
///
/// If a user with exactly this username and email already exists a new
/// code replaces the old one. A username or email that belongs to a
/// different account is rejected.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields, or username/email taken by someone else
/// - `503 Service Unavailable`: The confirmation email could not be sent
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<Json<SignupResponse>> {
    let Json(req) = payload?;

    with_checks(req.validate(), [("username", validate_username(&req.username))])?;

    let by_username = User::find_by_username(&state.db, &req.username).await?;
    let user = match by_username {
        Some(user) if user.email == req.email => {
            tracing::info!(user_id = user.id, "Re-issuing confirmation code");
            user
        }
        by_username => {
            let mut conflicts = Vec::new();
            if by_username.is_some() {
                conflicts.push(ValidationErrorDetail::new(
                    "username",
                    "A user with that username already exists",
                ));
            }
            if User::find_by_email(&state.db, &req.email).await?.is_some() {
                conflicts.push(ValidationErrorDetail::new(
                    "email",
                    "A user with that email already exists",
                ));
            }
            if !conflicts.is_empty() {
                return Err(ApiError::ValidationError(conflicts));
            }

            User::create(&state.db, CreateUser::new(req.username.clone(), req.email.clone())).await?
        }
    };

    let (code, code_hash) = confirmation_code::generate_code();
    let expires_at = Utc::now() + Duration::minutes(state.config.auth.confirmation_code_ttl_minutes);
    ConfirmationCode::issue(&state.db, user.id, &code_hash, expires_at).await?;

    state
        .mailer
        .send(confirmation_email(&user.email, &user.username, &code))
        .await?;

    Ok(Json(SignupResponse {
        email: user.email,
        username: user.username,
    }))
}

/// Exchange a confirmation code for an access token
///
/// ```text
/// POST /api/v1/auth/token
///
/// { "username": "reader", "confirmation_code": "..." }
/// ```
///
/// Answers `201 Created` with `{ "access": "<jwt>" }`. Each code works once.
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, or a wrong or expired code
/// - `404 Not Found`: No user with that username
pub async fn token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let invalid_code = || ApiError::field("confirmation_code", "Invalid or expired confirmation code");

    if !confirmation_code::is_well_formed(&req.confirmation_code) {
        return Err(invalid_code());
    }

    let code_hash = confirmation_code::hash_code(&req.confirmation_code);
    if !ConfirmationCode::consume(&state.db, user.id, &code_hash).await? {
        let reason = match ConfirmationCode::find_by_user(&state.db, user.id).await? {
            None => "no pending code",
            Some(pending) if pending.is_expired() => "code expired",
            Some(_) => "code mismatch",
        };
        tracing::info!(user_id = user.id, reason, "Confirmation code rejected");
        return Err(invalid_code());
    }

    let claims = jwt::Claims::with_expiration(user.id, Duration::hours(state.config.jwt.access_ttl_hours));
    let access = jwt::create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = user.id, "Access token issued");
    Ok((StatusCode::CREATED, Json(TokenResponse { access })))
}
