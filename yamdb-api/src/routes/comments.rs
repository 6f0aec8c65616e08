//! Comment endpoints, nested under a review of a title
//!
//! Same rules as reviews: public reads, authenticated posts, and edits by
//! the author, a moderator or an admin. The review must belong to the title
//! in the path.
//!
//! # Endpoints
//!
//! - `GET|POST /api/v1/titles/{title_id}/reviews/{review_id}/comments`
//! - `GET|PATCH|DELETE /api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    pagination::{Page, PageRequest},
    routes::{
        reviews::{load_review, PageQuery, POLICY},
        Caller, ResourcePath,
    },
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Query, State,
    },
    http::{Method, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;
use yamdb_shared::{
    auth::authorization::require_authenticated,
    models::comment::{Comment, CreateComment},
};

/// Comment representation
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: comment.author,
            pub_date: comment.pub_date,
        }
    }
}

/// Create and update payload
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub text: String,
}

async fn load_comment(pool: &PgPool, title_id: i64, review_id: i64, comment_id: i64) -> ApiResult<Comment> {
    load_review(pool, title_id, review_id).await?;

    Comment::find(pool, review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))
}

/// `GET .../reviews/{review_id}/comments`
pub async fn list_comments(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id)): ResourcePath<(i64, i64)>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Page<CommentResponse>>> {
    POLICY.check(&method, caller.auth())?;
    let Query(query) = query?;
    load_review(&state.db, title_id, review_id).await?;

    let request = PageRequest::new(query.page, state.config.api.page_size)?;
    let count = Comment::count_by_review(&state.db, review_id).await?;
    request.ensure_exists(count)?;
    let comments = Comment::list_by_review(&state.db, review_id, request.limit(), request.offset()).await?;

    Ok(Json(Page::new(request, count, comments, &uri).map(CommentResponse::from)))
}

/// `POST .../reviews/{review_id}/comments`
pub async fn create_comment(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id)): ResourcePath<(i64, i64)>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    POLICY.check(&method, caller.auth())?;
    let auth = require_authenticated(caller.auth())?;
    let Json(req) = payload?;
    req.validate()?;

    load_review(&state.db, title_id, review_id).await?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            review_id,
            author_id: auth.user_id,
            text: req.text,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// `GET .../comments/{comment_id}`
pub async fn get_comment(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id, comment_id)): ResourcePath<(i64, i64, i64)>,
) -> ApiResult<Json<CommentResponse>> {
    POLICY.check(&method, caller.auth())?;

    let comment = load_comment(&state.db, title_id, review_id, comment_id).await?;
    Ok(Json(comment.into()))
}

/// `PATCH .../comments/{comment_id}`
pub async fn update_comment(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id, comment_id)): ResourcePath<(i64, i64, i64)>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<Json<CommentResponse>> {
    POLICY.check(&method, caller.auth())?;

    let comment = load_comment(&state.db, title_id, review_id, comment_id).await?;
    POLICY.check_object(&method, caller.auth(), comment.author_id)?;

    let Json(req) = payload?;
    req.validate()?;

    let comment = Comment::update_text(&state.db, review_id, comment_id, req.text)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(Json(comment.into()))
}

/// `DELETE .../comments/{comment_id}`
pub async fn delete_comment(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id, comment_id)): ResourcePath<(i64, i64, i64)>,
) -> ApiResult<StatusCode> {
    POLICY.check(&method, caller.auth())?;

    let comment = load_comment(&state.db, title_id, review_id, comment_id).await?;
    POLICY.check_object(&method, caller.auth(), comment.author_id)?;

    Comment::delete(&state.db, review_id, comment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
