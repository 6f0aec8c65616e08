//! Application state and router builder
//!
//! This module defines the shared application state and provides
//! a function to build the Axum router with all routes and middleware.
//!
//! # Example
//!
//! ```no_run
//! use yamdb_api::{app::AppState, config::Config};
//! use yamdb_shared::mail::LogMailer;
//! use sqlx::PgPool;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = PgPool::connect(&config.database.url).await?;
//! let state = AppState::new(pool, config, Arc::new(LogMailer));
//! let app = yamdb_api::app::build_service(state);
//! # Ok(())
//! # }
//! ```

use crate::{config::Config, error::ApiError, middleware::security::security_headers, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use yamdb_shared::{
    auth::middleware::{authenticate, bearer_token},
    mail::Mailer,
};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Sends confirmation codes
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Health check
/// └── /api/v1/
///     ├── /auth/signup, /auth/token        # Confirmation code flow
///     ├── /users, /users/me, /users/:username
///     ├── /categories, /categories/:slug
///     ├── /genres, /genres/:slug
///     └── /titles/:title_id/reviews/:review_id/comments/:comment_id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. Compression
/// 3. CORS
/// 4. Logging (tower-http TraceLayer)
/// 5. Optional authentication: a valid bearer token becomes an
///    [`AuthContext`](yamdb_shared::auth::middleware::AuthContext) in the
///    request extensions, an invalid one is rejected with 401, and no token
///    leaves the request anonymous. Each handler applies its access policy.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/token", post(routes::auth::token));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users).post(routes::users::create_user))
        .route("/me", get(routes::users::get_me).patch(routes::users::update_me))
        .route(
            "/:username",
            get(routes::users::get_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(routes::taxonomy::list_categories).post(routes::taxonomy::create_category),
        )
        .route("/:slug", delete(routes::taxonomy::delete_category));

    let genre_routes = Router::new()
        .route("/", get(routes::taxonomy::list_genres).post(routes::taxonomy::create_genre))
        .route("/:slug", delete(routes::taxonomy::delete_genre));

    let title_routes = Router::new()
        .route("/", get(routes::titles::list_titles).post(routes::titles::create_title))
        .route(
            "/:title_id",
            get(routes::titles::get_title)
                .patch(routes::titles::update_title)
                .delete(routes::titles::delete_title),
        )
        .route(
            "/:title_id/reviews",
            get(routes::reviews::list_reviews).post(routes::reviews::create_review),
        )
        .route(
            "/:title_id/reviews/:review_id",
            get(routes::reviews::get_review)
                .patch(routes::reviews::update_review)
                .delete(routes::reviews::delete_review),
        )
        .route(
            "/:title_id/reviews/:review_id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/:title_id/reviews/:review_id/comments/:comment_id",
            get(routes::comments::get_comment)
                .patch(routes::comments::update_comment)
                .delete(routes::comments::delete_comment),
        );

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/categories", category_routes)
        .nest("/genres", genre_routes)
        .nest("/titles", title_routes)
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn_with_state(production, security_headers))
        .with_state(state)
}

/// Router wrapped so that `/titles/` and `/titles` reach the same handler
///
/// Path normalization has to run before routing, so it wraps the router
/// instead of being one of its layers.
pub fn build_service(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}

/// Optional JWT authentication
///
/// Reloads the user for every authenticated request, so role changes and
/// deletions apply immediately.
async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    if let Some(token) = bearer_token(req.headers())? {
        let auth = authenticate(&state.db, state.jwt_secret(), token).await?;
        tracing::debug!(user_id = auth.user_id, role = %auth.role, "Authenticated request");
        req.extensions_mut().insert(auth);
    }

    Ok(next.run(req).await)
}
