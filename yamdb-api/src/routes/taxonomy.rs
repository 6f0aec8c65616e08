//! Category and genre endpoints
//!
//! Both vocabularies expose the same three operations; reads are public,
//! writes need an admin. Terms are addressed by slug.
//!
//! # Endpoints
//!
//! - `GET /api/v1/categories?search=&page=`, `GET /api/v1/genres?search=&page=`
//! - `POST /api/v1/categories`, `POST /api/v1/genres`
//! - `DELETE /api/v1/categories/{slug}`, `DELETE /api/v1/genres/{slug}`

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
    http::{Method, StatusCode, Uri},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_shared::{
    auth::authorization::AccessPolicy,
    models::taxonomy::{CreateTerm, Taxonomy, Term},
    validation::{validate_slug, with_checks},
};

const POLICY: AccessPolicy = AccessPolicy::AdminOrReadOnly;

/// Term representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermResponse {
    pub name: String,
    pub slug: String,
}

impl From<Term> for TermResponse {
    fn from(term: Term) -> Self {
        Self {
            name: term.name,
            slug: term.slug,
        }
    }
}

/// `?search=&page=`
#[derive(Debug, Default, Deserialize)]
pub struct TermListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
}

/// Create payload
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTermRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 256, message = "Name must be 1 to 256 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Slug must be 1 to 50 characters"))]
    pub slug: String,
}

impl CreateTermRequest {
    fn validated(self) -> ApiResult<CreateTerm> {
        with_checks(self.validate(), [("slug", validate_slug(&self.slug))])?;
        Ok(CreateTerm {
            name: self.name,
            slug: self.slug,
        })
    }
}

async fn list_terms(
    taxonomy: Taxonomy,
    state: AppState,
    caller: Caller,
    method: Method,
    uri: Uri,
    query: Result<Query<TermListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<TermResponse>>> {
    POLICY.check(&method, caller.auth())?;
    let Query(query) = query?;

    let request = PageRequest::new(query.page, state.config.api.page_size)?;
    let search = query.search.as_deref();

    let count = Term::count(&state.db, taxonomy, search).await?;
    request.ensure_exists(count)?;
    let terms = Term::list(&state.db, taxonomy, search, request.limit(), request.offset()).await?;

    Ok(Json(Page::new(request, count, terms, &uri).map(TermResponse::from)))
}

async fn create_term(
    taxonomy: Taxonomy,
    state: AppState,
    caller: Caller,
    method: Method,
    payload: Result<Json<CreateTermRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TermResponse>)> {
    POLICY.check(&method, caller.auth())?;
    let Json(req) = payload?;

    let term = Term::create(&state.db, taxonomy, req.validated()?).await?;

    Ok((StatusCode::CREATED, Json(term.into())))
}

async fn delete_term(
    taxonomy: Taxonomy,
    state: AppState,
    caller: Caller,
    method: Method,
    slug: String,
) -> ApiResult<StatusCode> {
    POLICY.check(&method, caller.auth())?;

    if !Term::delete_by_slug(&state.db, taxonomy, &slug).await? {
        return Err(ApiError::NotFound(format!("{} not found", taxonomy.label())));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /categories`
pub async fn list_categories(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<TermListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<TermResponse>>> {
    list_terms(Taxonomy::Category, state, caller, method, uri, query).await
}

/// `POST /categories`
pub async fn create_category(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    payload: Result<Json<CreateTermRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TermResponse>)> {
    create_term(Taxonomy::Category, state, caller, method, payload).await
}

/// `DELETE /categories/{slug}`
///
/// Titles in the category keep existing with no category.
pub async fn delete_category(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    delete_term(Taxonomy::Category, state, caller, method, slug).await
}

/// `GET /genres`
pub async fn list_genres(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<TermListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<TermResponse>>> {
    list_terms(Taxonomy::Genre, state, caller, method, uri, query).await
}

/// `POST /genres`
pub async fn create_genre(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    payload: Result<Json<CreateTermRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TermResponse>)> {
    create_term(Taxonomy::Genre, state, caller, method, payload).await
}

/// `DELETE /genres/{slug}`
pub async fn delete_genre(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    delete_term(Taxonomy::Genre, state, caller, method, slug).await
}
