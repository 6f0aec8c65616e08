//! Integration tests for the YaMDb API
//!
//! The first group drives the router over a pool that never connects, so it
//! only covers requests answered before any query: routing, authentication,
//! authorization and payload validation.
//!
//! The second group needs PostgreSQL at `DATABASE_URL` and is ignored by
//! default:
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/yamdb_test cargo test -p yamdb-api -- --ignored
//! ```

mod common;

use axum::http::{header, Method, StatusCode};
use common::{expired_token_for, json_request, lazy_state, send, token_for, unique, TestContext};
use serde_json::json;
use yamdb_api::app::build_service;
use yamdb_shared::models::{taxonomy::Taxonomy, user::UserRole};

async fn call_lazy(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> common::TestResponse {
    send(build_service(lazy_state()), json_request(method, uri, token, body)).await
}

// ---------------------------------------------------------------------------
// No database required
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let response = call_lazy(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["database"], "disconnected");
    assert_eq!(response.body["pool"]["active_connections"], 0);
    assert!(response.body["pool"]["total_connections"].is_u64());
}

#[tokio::test]
async fn test_anonymous_writes_are_unauthorized() {
    for (method, uri) in [
        (Method::POST, "/api/v1/categories"),
        (Method::DELETE, "/api/v1/genres/drama"),
        (Method::POST, "/api/v1/titles"),
        (Method::PATCH, "/api/v1/titles/1"),
        (Method::POST, "/api/v1/titles/1/reviews"),
        (Method::DELETE, "/api/v1/titles/1/reviews/2/comments/3"),
    ] {
        let response = call_lazy(method.clone(), uri, None, Some(json!({}))).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(response.body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_user_endpoints_require_authentication() {
    for uri in ["/api/v1/users", "/api/v1/users/me", "/api/v1/users/someone"] {
        let response = call_lazy(Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected_everywhere() {
    let response = call_lazy(Method::GET, "/api/v1/titles", Some("not-a-jwt"), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let expired = expired_token_for(1);
    let response = call_lazy(Method::GET, "/api/v1/genres", Some(&expired), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let forged = yamdb_shared::auth::jwt::create_token(
        &yamdb_shared::auth::jwt::Claims::new(1),
        "some-other-secret-that-is-long-enough",
    )
    .unwrap();
    let response = call_lazy(Method::GET, "/api/v1/categories", Some(&forged), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let request = axum::http::Request::builder()
        .uri("/api/v1/titles")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(build_service(lazy_state()), request).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unrouted_methods_are_not_allowed() {
    for (method, uri) in [
        (Method::PUT, "/api/v1/titles/1"),
        (Method::GET, "/api/v1/categories/film"),
        (Method::PATCH, "/api/v1/genres/drama"),
        (Method::PUT, "/api/v1/titles/1/reviews/1"),
        (Method::GET, "/api/v1/auth/token"),
        (Method::DELETE, "/api/v1/users/me"),
    ] {
        let response = call_lazy(method.clone(), uri, None, None).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let response = call_lazy(Method::GET, "/api/v1/movies", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let response = call_lazy(Method::GET, "/api/v1/titles/abc", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "not_found");

    let response = call_lazy(Method::GET, "/api/v1/titles/1/reviews/x/comments", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trailing_slash_reaches_same_handler() {
    let response = call_lazy(Method::POST, "/api/v1/titles/", None, Some(json!({}))).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = call_lazy(Method::GET, "/api/v1/users/me/", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let response = call_lazy(Method::GET, "/api/v1/users", None, None).await;

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert!(response.headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_signup_validation_happens_before_database() {
    let response = call_lazy(
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({"username": "me", "email": "not-an-email"})),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    let fields: Vec<&str> = response.body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
}

#[tokio::test]
async fn test_token_requires_fields() {
    let response = call_lazy(Method::POST, "/api/v1/auth/token", None, Some(json!({}))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = send(build_service(lazy_state()), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Database required
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_signup_and_token_flow() {
    let ctx = TestContext::new().await.unwrap();
    let username = unique("reader");
    let email = format!("{username}@example.com");
    ctx.track_user(&username);

    let response = ctx
        .call(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"username": username, "email": email})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"username": username, "email": email}));

    let code = ctx.mailer.last_code_for(&email).expect("code mailed");

    // Wrong code
    let response = ctx
        .call(
            Method::POST,
            "/api/v1/auth/token",
            None,
            Some(json!({"username": username, "confirmation_code": "A".repeat(16)})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Unknown user
    let response = ctx
        .call(
            Method::POST,
            "/api/v1/auth/token",
            None,
            Some(json!({"username": unique("ghost"), "confirmation_code": code})),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx
        .call(
            Method::POST,
            "/api/v1/auth/token",
            None,
            Some(json!({"username": username, "confirmation_code": code})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let access = response.body["access"].as_str().unwrap().to_string();

    // Single use
    let response = ctx
        .call(
            Method::POST,
            "/api/v1/auth/token",
            None,
            Some(json!({"username": username, "confirmation_code": code})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.call(Method::GET, "/api/v1/users/me", Some(&access), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], username.as_str());
    assert_eq!(response.body["role"], "user");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_signup_reissues_and_detects_conflicts() {
    let ctx = TestContext::new().await.unwrap();
    let username = unique("reader");
    let email = format!("{username}@example.com");
    ctx.track_user(&username);

    let body = json!({"username": username, "email": email});
    let first = ctx.call(Method::POST, "/api/v1/auth/signup", None, Some(body.clone())).await;
    assert_eq!(first.status, StatusCode::OK);
    let first_code = ctx.mailer.last_code_for(&email).unwrap();

    // Same pair again: new code replaces the old one
    let again = ctx.call(Method::POST, "/api/v1/auth/signup", None, Some(body)).await;
    assert_eq!(again.status, StatusCode::OK);
    let second_code = ctx.mailer.last_code_for(&email).unwrap();
    assert_ne!(first_code, second_code);
    assert_eq!(ctx.mailer.sent_count(), 2);

    let stale = ctx
        .call(
            Method::POST,
            "/api/v1/auth/token",
            None,
            Some(json!({"username": username, "confirmation_code": first_code})),
        )
        .await;
    assert_eq!(stale.status, StatusCode::BAD_REQUEST);

    // Username taken with another email
    let response = ctx
        .call(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"username": username, "email": format!("other-{email}")})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "username");

    // Email taken by another username
    let response = ctx
        .call(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"username": unique("other"), "email": email})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "email");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_role_permissions_on_vocabularies() {
    let ctx = TestContext::new().await.unwrap();
    let (_, user_token) = ctx.user(UserRole::User).await.unwrap();
    let (_, moderator_token) = ctx.user(UserRole::Moderator).await.unwrap();
    let (_, admin_token) = ctx.user(UserRole::Admin).await.unwrap();

    let slug = unique("genre");
    ctx.track_term(Taxonomy::Genre, &slug);
    let body = json!({"name": "Test genre", "slug": slug});

    for token in [&user_token, &moderator_token] {
        let response = ctx.call(Method::POST, "/api/v1/genres", Some(token), Some(body.clone())).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    let response = ctx.call(Method::POST, "/api/v1/genres", Some(&admin_token), Some(body.clone())).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body, body);

    // Duplicate slug
    let response = ctx.call(Method::POST, "/api/v1/genres", Some(&admin_token), Some(body)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "slug");

    // Public read with search
    let response = ctx
        .call(Method::GET, &format!("/api/v1/genres?search={slug}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx
        .call(Method::DELETE, &format!("/api/v1/genres/{slug}"), Some(&admin_token), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = ctx
        .call(Method::DELETE, &format!("/api/v1/genres/{slug}"), Some(&admin_token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_titles_reviews_and_comments() {
    let ctx = TestContext::new().await.unwrap();
    let (_, admin) = ctx.user(UserRole::Admin).await.unwrap();
    let (_, moderator) = ctx.user(UserRole::Moderator).await.unwrap();
    let (alice, alice_token) = ctx.user(UserRole::User).await.unwrap();
    let (_, bob_token) = ctx.user(UserRole::User).await.unwrap();

    let category = unique("cat");
    let genre = unique("genre");
    ctx.track_term(Taxonomy::Category, &category);
    ctx.track_term(Taxonomy::Genre, &genre);
    ctx.call(Method::POST, "/api/v1/categories", Some(&admin), Some(json!({"name": "Film", "slug": category})))
        .await;
    ctx.call(Method::POST, "/api/v1/genres", Some(&admin), Some(json!({"name": "Drama", "slug": genre})))
        .await;

    // Unknown genre slug
    let response = ctx
        .call(
            Method::POST,
            "/api/v1/titles",
            Some(&admin),
            Some(json!({"name": "Solaris", "year": 1972, "genre": ["no-such-genre"]})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Future year
    let response = ctx
        .call(Method::POST, "/api/v1/titles", Some(&admin), Some(json!({"name": "Later", "year": 3000})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .call(
            Method::POST,
            "/api/v1/titles",
            Some(&admin),
            Some(json!({"name": "Solaris", "year": 1972, "category": category, "genre": [genre]})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let title_id = response.body["id"].as_i64().unwrap();
    ctx.track_title(title_id);
    assert_eq!(response.body["rating"], serde_json::Value::Null);
    assert_eq!(response.body["category"]["slug"], category.as_str());
    assert_eq!(response.body["genre"][0]["slug"], genre.as_str());

    // Filter by genre
    let response = ctx
        .call(Method::GET, &format!("/api/v1/titles?genre={genre}&year=1972"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 1);

    let reviews = format!("/api/v1/titles/{title_id}/reviews");

    // Score out of range
    let response = ctx
        .call(Method::POST, &reviews, Some(&alice_token), Some(json!({"text": "Great", "score": 11})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .call(Method::POST, &reviews, Some(&alice_token), Some(json!({"text": "Great", "score": 9})))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["author"], alice.username.as_str());
    let review_id = response.body["id"].as_i64().unwrap();

    // One review per title
    let response = ctx
        .call(Method::POST, &reviews, Some(&alice_token), Some(json!({"text": "Again", "score": 1})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .call(Method::POST, &reviews, Some(&bob_token), Some(json!({"text": "Meh", "score": 2})))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = ctx.call(Method::GET, &format!("/api/v1/titles/{title_id}"), None, None).await;
    assert_eq!(response.body["rating"].as_f64(), Some(5.5));

    let review = format!("{reviews}/{review_id}");

    // Not the author
    let response = ctx
        .call(Method::PATCH, &review, Some(&bob_token), Some(json!({"text": "Hijacked"})))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .call(Method::PATCH, &review, Some(&moderator), Some(json!({"text": "Moderated"})))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["text"], "Moderated");
    assert_eq!(response.body["score"], 9);

    // Comments
    let comments = format!("{review}/comments");
    let response = ctx
        .call(Method::POST, &comments, Some(&bob_token), Some(json!({"text": "Disagree"})))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let comment_id = response.body["id"].as_i64().unwrap();

    let response = ctx.call(Method::GET, &comments, None, None).await;
    assert_eq!(response.body["count"], 1);

    let response = ctx
        .call(Method::DELETE, &format!("{comments}/{comment_id}"), Some(&alice_token), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Review under another title is not found
    let response = ctx
        .call(Method::GET, &format!("/api/v1/titles/{}/reviews/{review_id}", title_id + 1_000_000), None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // Deleting the review takes its comments along
    let response = ctx.call(Method::DELETE, &review, Some(&alice_token), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = ctx.call(Method::GET, &format!("{comments}/{comment_id}"), None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // Deleting the category keeps the title
    let response = ctx
        .call(Method::DELETE, &format!("/api/v1/categories/{category}"), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = ctx.call(Method::GET, &format!("/api/v1/titles/{title_id}"), None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["category"], serde_json::Value::Null);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_patch_missing_title_is_not_found_before_slug_checks() {
    let ctx = TestContext::new().await.unwrap();
    let (_, admin) = ctx.user(UserRole::Admin).await.unwrap();

    let missing = "/api/v1/titles/9223372036854775807";
    for body in [
        json!({"category": "no-such-category"}),
        json!({"genre": ["no-such-genre"]}),
        json!({"name": "Renamed"}),
    ] {
        let response = ctx.call(Method::PATCH, missing, Some(&admin), Some(body.clone())).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{body}");
        assert_eq!(response.body["error"], "not_found");
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_administration() {
    let ctx = TestContext::new().await.unwrap();
    let (_, admin) = ctx.user(UserRole::Admin).await.unwrap();
    let (reader, reader_token) = ctx.user(UserRole::User).await.unwrap();

    let response = ctx.call(Method::GET, "/api/v1/users", Some(&reader_token), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .call(Method::GET, &format!("/api/v1/users?search={}", reader.username), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 1);
    assert_eq!(response.body["results"][0]["username"], reader.username.as_str());

    // Role cannot be raised through /users/me
    let response = ctx
        .call(
            Method::PATCH,
            "/api/v1/users/me",
            Some(&reader_token),
            Some(json!({"role": "admin", "bio": "Film buff"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["role"], "user");
    assert_eq!(response.body["bio"], "Film buff");

    // Admin can
    let response = ctx
        .call(
            Method::PATCH,
            &format!("/api/v1/users/{}", reader.username),
            Some(&admin),
            Some(json!({"role": "moderator"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["role"], "moderator");

    let created = unique("made");
    ctx.track_user(&created);
    let response = ctx
        .call(
            Method::POST,
            "/api/v1/users",
            Some(&admin),
            Some(json!({"username": created, "email": format!("{created}@example.com")})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "user");

    let response = ctx
        .call(Method::DELETE, &format!("/api/v1/users/{created}"), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    // A deleted user's token stops working
    let response = ctx
        .call(Method::DELETE, &format!("/api/v1/users/{}", reader.username), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = ctx
        .call(Method::GET, "/api/v1/titles", Some(&token_for(reader.id)), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pagination_bounds() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.call(Method::GET, "/api/v1/genres?page=0", None, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.call(Method::GET, "/api/v1/genres?page=100000", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx.call(Method::GET, "/api/v1/genres", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["results"].is_array());
    assert_eq!(response.body["previous"], serde_json::Value::Null);

    ctx.cleanup().await.unwrap();
}
