//! Review endpoints, nested under a title
//!
//! Anyone may read. Any authenticated user may post one review per title.
//! The author, a moderator or an admin may edit or delete it.
//!
//! # Endpoints
//!
//! - `GET|POST /api/v1/titles/{title_id}/reviews`
//! - `GET|PATCH|DELETE /api/v1/titles/{title_id}/reviews/{review_id}`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    pagination::{Page, PageRequest},
    routes::{Caller, ResourcePath},
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
    auth::authorization::{require_authenticated, AccessPolicy},
    models::{
        review::{CreateReview, Review, UpdateReview},
        title::Title,
    },
    validation::{require_present, validate_score, with_checks},
};

pub(crate) const POLICY: AccessPolicy = AccessPolicy::AdminModeratorAuthorOrReadOnly;

/// Review representation
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub text: String,
    /// Author's username
    pub author: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author: review.author,
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

/// `?page=`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

/// Create payload
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub text: String,

    pub score: Option<i16>,
}

/// Partial update payload
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub text: Option<String>,

    pub score: Option<i16>,
}

pub(crate) async fn ensure_title(pool: &PgPool, title_id: i64) -> ApiResult<()> {
    if Title::exists(pool, title_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Title not found".to_string()))
    }
}

/// Loads a review, 404 when it is missing or filed under another title
pub(crate) async fn load_review(pool: &PgPool, title_id: i64, review_id: i64) -> ApiResult<Review> {
    Review::find(pool, title_id, review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))
}

/// `GET /titles/{title_id}/reviews`
pub async fn list_reviews(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath(title_id): ResourcePath<i64>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Page<ReviewResponse>>> {
    POLICY.check(&method, caller.auth())?;
    let Query(query) = query?;
    ensure_title(&state.db, title_id).await?;

    let request = PageRequest::new(query.page, state.config.api.page_size)?;
    let count = Review::count_by_title(&state.db, title_id).await?;
    request.ensure_exists(count)?;
    let reviews = Review::list_by_title(&state.db, title_id, request.limit(), request.offset()).await?;

    Ok(Json(Page::new(request, count, reviews, &uri).map(ReviewResponse::from)))
}

/// `POST /titles/{title_id}/reviews`
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields, or the caller already reviewed this title
/// - `401 Unauthorized`: Anonymous caller
/// - `404 Not Found`: No such title
pub async fn create_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath(title_id): ResourcePath<i64>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    POLICY.check(&method, caller.auth())?;
    let auth = require_authenticated(caller.auth())?;
    let Json(req) = payload?;

    let score_check = match req.score {
        Some(score) => validate_score(score),
        None => require_present(&req.score),
    };
    with_checks(req.validate(), [("score", score_check)])?;
    let score = req.score.ok_or_else(|| ApiError::field("score", "This field is required"))?;

    ensure_title(&state.db, title_id).await?;

    if Review::exists_for_author(&state.db, title_id, auth.user_id).await? {
        return Err(ApiError::field("title", "You have already reviewed this title"));
    }

    let review = Review::create(
        &state.db,
        CreateReview {
            title_id,
            author_id: auth.user_id,
            text: req.text,
            score,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(review.into())))
}

/// `GET /titles/{title_id}/reviews/{review_id}`
pub async fn get_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id)): ResourcePath<(i64, i64)>,
) -> ApiResult<Json<ReviewResponse>> {
    POLICY.check(&method, caller.auth())?;

    let review = load_review(&state.db, title_id, review_id).await?;
    Ok(Json(review.into()))
}

/// `PATCH /titles/{title_id}/reviews/{review_id}`
pub async fn update_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id)): ResourcePath<(i64, i64)>,
    payload: Result<Json<UpdateReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewResponse>> {
    POLICY.check(&method, caller.auth())?;

    let review = load_review(&state.db, title_id, review_id).await?;
    POLICY.check_object(&method, caller.auth(), review.author_id)?;

    let Json(req) = payload?;
    let score_check = req.score.map(validate_score).unwrap_or(Ok(()));
    with_checks(req.validate(), [("score", score_check)])?;

    let update = UpdateReview {
        text: req.text,
        score: req.score,
    };
    let review = Review::update(&state.db, title_id, review_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;

    Ok(Json(review.into()))
}

/// `DELETE /titles/{title_id}/reviews/{review_id}`
///
/// Comments on the review are deleted with it.
pub async fn delete_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath((title_id, review_id)): ResourcePath<(i64, i64)>,
) -> ApiResult<StatusCode> {
    POLICY.check(&method, caller.auth())?;

    let review = load_review(&state.db, title_id, review_id).await?;
    POLICY.check_object(&method, caller.auth(), review.author_id)?;

    Review::delete(&state.db, title_id, review_id).await?;

    tracing::info!(review_id, title_id, by = ?caller.auth().map(|a| a.user_id), "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}
