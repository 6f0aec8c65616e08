//! User administration and the caller's own profile
//!
//! # Endpoints
//!
//! - `GET /api/v1/users?search=&page=` - List users (admin)
//! - `POST /api/v1/users` - Create a user (admin)
//! - `GET|PATCH|DELETE /api/v1/users/{username}` - Manage one user (admin)
//! - `GET|PATCH /api/v1/users/me` - Own profile (any authenticated user; role is read-only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    pagination::{Page, PageRequest},
    routes::Caller,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Path, Query, State,
    },
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_shared::{
    auth::authorization::{require_authenticated, AccessPolicy},
    models::user::{CreateUser, UpdateUser, User, UserRole},
    validation::{validate_username, with_checks},
};

const POLICY: AccessPolicy = AccessPolicy::AdminOnly;

/// User representation
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: UserRole,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

/// `?search=&page=`
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
}

/// Create payload
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,

    #[serde(default)]
    pub bio: String,

    pub role: Option<UserRole>,
}

/// Partial update payload
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: Option<String>,

    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: Option<String>,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<UserRole>,
}

impl UpdateUserRequest {
    fn validated(self) -> ApiResult<UpdateUser> {
        let username_check = self.username.as_deref().map(validate_username).unwrap_or(Ok(()));
        with_checks(self.validate(), [("username", username_check)])?;

        Ok(UpdateUser {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role: self.role,
        })
    }
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// `GET /users`
pub async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<UserResponse>>> {
    POLICY.check(&method, caller.auth())?;
    let Query(query) = query?;

    let request = PageRequest::new(query.page, state.config.api.page_size)?;
    let search = query.search.as_deref();

    let count = User::count(&state.db, search).await?;
    request.ensure_exists(count)?;
    let users = User::list(&state.db, search, request.limit(), request.offset()).await?;

    Ok(Json(Page::new(request, count, users, &uri).map(UserResponse::from)))
}

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    POLICY.check(&method, caller.auth())?;
    let Json(req) = payload?;
    with_checks(req.validate(), [("username", validate_username(&req.username))])?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
            role: req.role.unwrap_or_default(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `GET /users/{username}`
pub async fn get_user(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(username): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    POLICY.check(&method, caller.auth())?;

    let user = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user.into()))
}

/// `PATCH /users/{username}`
pub async fn update_user(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(username): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    POLICY.check(&method, caller.auth())?;
    let Json(req) = payload?;
    let update = req.validated()?;

    let user = User::update(&state.db, &username, update)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = user.id, by = ?caller.auth().map(|a| a.user_id), "User updated");
    Ok(Json(user.into()))
}

/// `DELETE /users/{username}`
pub async fn delete_user(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    POLICY.check(&method, caller.auth())?;

    if !User::delete(&state.db, &username).await? {
        return Err(user_not_found());
    }

    tracing::info!(username = %username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/me`
pub async fn get_me(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<UserResponse>> {
    let auth = require_authenticated(caller.auth())?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user.into()))
}

/// `PATCH /users/me`
///
/// A submitted `role` is ignored.
pub async fn update_me(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let auth = require_authenticated(caller.auth())?;
    let Json(req) = payload?;

    let mut update = req.validated()?;
    update.role = None;

    let user = User::update(&state.db, &auth.username, update)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user.into()))
}
