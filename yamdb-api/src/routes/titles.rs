//! Title endpoints
//!
//! Reads are public; writes need an admin. Writes name the category and
//! genres by slug, reads return them in full.
//!
//! # Endpoints
//!
//! - `GET /api/v1/titles?name=&year=&category=&genre=&page=` - Filtered list
//! - `POST /api/v1/titles` - Create
//! - `GET|PATCH|DELETE /api/v1/titles/{id}` - One title

use std::collections::BTreeSet;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    pagination::{Page, PageRequest},
    routes::{taxonomy::TermResponse, Caller, ResourcePath},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Query, State,
    },
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;
use yamdb_shared::{
    auth::authorization::AccessPolicy,
    models::{
        deserialize_some,
        taxonomy::{Taxonomy, Term},
        title::{CreateTitle, Title, TitleFilter, UpdateTitle},
    },
    validation::{require_present, validate_year, with_checks},
};

const POLICY: AccessPolicy = AccessPolicy::AdminOrReadOnly;

/// Title representation
#[derive(Debug, Serialize, Deserialize)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<TermResponse>,
    pub category: Option<TermResponse>,
}

impl From<Title> for TitleResponse {
    fn from(title: Title) -> Self {
        Self {
            id: title.id,
            name: title.name,
            year: title.year,
            rating: title.rating,
            description: title.description,
            genre: title.genres.into_iter().map(TermResponse::from).collect(),
            category: title.category.map(TermResponse::from),
        }
    }
}

/// `?name=&year=&category=&genre=&page=`
#[derive(Debug, Default, Deserialize)]
pub struct TitleListQuery {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub page: Option<u32>,
}

impl TitleListQuery {
    fn filter(&self) -> TitleFilter {
        TitleFilter {
            name: self.name.clone(),
            year: self.year,
            category: self.category.clone(),
            genre: self.genre.clone(),
        }
    }
}

/// Create payload
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 256, message = "Name must be 1 to 256 characters"))]
    pub name: String,

    pub year: Option<i32>,

    pub description: Option<String>,

    /// Category slug
    pub category: Option<String>,

    /// Genre slugs
    #[serde(default)]
    pub genre: Vec<String>,
}

/// Partial update payload
///
/// `description` and `category` may be set to `null` to clear them.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 256, message = "Name must be 1 to 256 characters"))]
    pub name: Option<String>,

    pub year: Option<i32>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub category: Option<Option<String>>,

    pub genre: Option<Vec<String>>,
}

fn title_not_found() -> ApiError {
    ApiError::NotFound("Title not found".to_string())
}

/// Resolves a category slug to its id
async fn resolve_category(pool: &PgPool, slug: &str) -> ApiResult<i64> {
    Term::find_by_slug(pool, Taxonomy::Category, slug)
        .await?
        .map(|term| term.id)
        .ok_or_else(|| ApiError::field("category", format!("Category with slug \"{slug}\" does not exist")))
}

/// Resolves genre slugs to ids; repeated slugs count once
async fn resolve_genres(pool: &PgPool, slugs: &[String]) -> ApiResult<Vec<i64>> {
    let wanted: BTreeSet<&str> = slugs.iter().map(String::as_str).collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let wanted_slugs: Vec<String> = wanted.iter().map(|s| s.to_string()).collect();
    let terms = Term::find_by_slugs(pool, Taxonomy::Genre, &wanted_slugs).await?;

    if terms.len() != wanted.len() {
        let missing: Vec<&str> = wanted
            .into_iter()
            .filter(|slug| !terms.iter().any(|term| term.slug == *slug))
            .collect();
        return Err(ApiError::field(
            "genre",
            format!("Unknown genre slugs: {}", missing.join(", ")),
        ));
    }

    Ok(terms.into_iter().map(|term| term.id).collect())
}

/// `GET /titles`
pub async fn list_titles(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<TitleListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<TitleResponse>>> {
    POLICY.check(&method, caller.auth())?;
    let Query(query) = query?;

    let request = PageRequest::new(query.page, state.config.api.page_size)?;
    let filter = query.filter();

    let count = Title::count(&state.db, &filter).await?;
    request.ensure_exists(count)?;
    let titles = Title::list(&state.db, &filter, request.limit(), request.offset()).await?;

    Ok(Json(Page::new(request, count, titles, &uri).map(TitleResponse::from)))
}

/// `POST /titles`
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields, a future year, or an unknown category or genre slug
pub async fn create_title(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    payload: Result<Json<CreateTitleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TitleResponse>)> {
    POLICY.check(&method, caller.auth())?;
    let Json(req) = payload?;

    let year_check = match req.year {
        Some(year) => validate_year(year),
        None => require_present(&req.year),
    };
    with_checks(req.validate(), [("year", year_check)])?;
    let year = req.year.ok_or_else(|| ApiError::field("year", "This field is required"))?;

    let category_id = match req.category.as_deref() {
        Some(slug) => Some(resolve_category(&state.db, slug).await?),
        None => None,
    };
    let genre_ids = resolve_genres(&state.db, &req.genre).await?;

    let title = Title::create(
        &state.db,
        CreateTitle {
            name: req.name,
            year,
            description: req.description,
            category_id,
            genre_ids,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(title.into())))
}

/// `GET /titles/{id}`
pub async fn get_title(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath(id): ResourcePath<i64>,
) -> ApiResult<Json<TitleResponse>> {
    POLICY.check(&method, caller.auth())?;

    let title = Title::find_by_id(&state.db, id)
        .await?
        .ok_or_else(title_not_found)?;

    Ok(Json(title.into()))
}

/// `PATCH /titles/{id}`
pub async fn update_title(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath(id): ResourcePath<i64>,
    payload: Result<Json<UpdateTitleRequest>, JsonRejection>,
) -> ApiResult<Json<TitleResponse>> {
    POLICY.check(&method, caller.auth())?;
    let Json(req) = payload?;

    if !Title::exists(&state.db, id).await? {
        return Err(title_not_found());
    }

    let year_check = req.year.map(validate_year).unwrap_or(Ok(()));
    with_checks(req.validate(), [("year", year_check)])?;

    let category_id = match req.category {
        Some(Some(slug)) => Some(Some(resolve_category(&state.db, &slug).await?)),
        Some(None) => Some(None),
        None => None,
    };
    let genre_ids = match req.genre {
        Some(slugs) => Some(resolve_genres(&state.db, &slugs).await?),
        None => None,
    };

    let update = UpdateTitle {
        name: req.name,
        year: req.year,
        description: req.description,
        category_id,
        genre_ids,
    };

    let title = Title::update(&state.db, id, update)
        .await?
        .ok_or_else(title_not_found)?;

    Ok(Json(title.into()))
}

/// `DELETE /titles/{id}`
///
/// Reviews of the title and their comments are deleted with it.
pub async fn delete_title(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    ResourcePath(id): ResourcePath<i64>,
) -> ApiResult<StatusCode> {
    POLICY.check(&method, caller.auth())?;

    if !Title::delete(&state.db, id).await? {
        return Err(title_not_found());
    }

    tracing::info!(title_id = id, "Title deleted");
    Ok(StatusCode::NO_CONTENT)
}
