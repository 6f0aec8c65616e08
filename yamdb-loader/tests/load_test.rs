//! Loader tests against a scratch database
//!
//! Each test creates its own database next to the one named by
//! `DATABASE_URL` and drops it afterwards.
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/yamdb_test cargo test -p yamdb-loader -- --ignored
//! ```

use std::fs;

use sqlx::PgPool;
use tempfile::{tempdir, TempDir};
use yamdb_loader::{
    fixtures::Fixtures,
    loader::{load, LoadError, LoadOutcome},
};
use yamdb_shared::db::migrations::{drop_database, ensure_database_exists, run_migrations};

/// `DATABASE_URL` with the database name replaced
fn scratch_url(name: &str) -> String {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let base = url.split('?').next().unwrap_or(&url);
    let (server, _) = base.rsplit_once('/').expect("DATABASE_URL has no database name");
    format!("{server}/yamdb_loader_{name}_{}", std::process::id())
}

async fn scratch_database(name: &str) -> (String, PgPool) {
    let url = scratch_url(name);
    drop_database(&url).await.unwrap();
    ensure_database_exists(&url).await.unwrap();
    let pool = PgPool::connect(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    (url, pool)
}

async fn teardown(url: String, pool: PgPool) {
    pool.close().await;
    drop_database(&url).await.unwrap();
}

/// CSV fixtures, except comments which are JSON
fn fixture_dir() -> TempDir {
    let dir = tempdir().unwrap();
    let write = |name: &str, contents: &str| fs::write(dir.path().join(name), contents).unwrap();

    write(
        "users.csv",
        "id,username,email,role,bio,first_name,last_name\n\
         100,bingobongo,bingobongo@yamdb.fake,user,,,\n\
         101,capt_obvious,capt_obvious@yamdb.fake,admin,,,\n",
    );
    write("category.csv", "id,name,slug\n1,Фильм,movie\n");
    write("genre.csv", "id,name,slug\n1,Драма,drama\n2,Комедия,comedy\n");
    write("titles.csv", "id,name,year,category\n1,Побег из Шоушенка,1994,1\n");
    write("genre_title.csv", "id,title_id,genre_id\n1,1,1\n");
    write(
        "review.csv",
        "id,title_id,text,author,score,pub_date\n\
         1,1,Ничего особенного,100,10,2019-09-24T21:08:21.567Z\n\
         2,1,Отлично,101,7,2019-09-25T21:08:21.567Z\n",
    );
    write(
        "comments.json",
        r#"[{"id": 1, "review_id": 1, "author": 101, "text": "Согласен", "pub_date": "2019-09-26T21:08:21.567Z"}]"#,
    );

    dir
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_load_into_empty_database() {
    let (url, pool) = scratch_database("fresh").await;
    let dir = fixture_dir();
    let fixtures = Fixtures::read_dir(dir.path()).unwrap();

    let outcome = load(&pool, &fixtures).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { records: 10 });

    let rating: Option<f64> =
        sqlx::query_scalar("SELECT AVG(score)::float8 FROM reviews WHERE title_id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rating, Some(8.5));

    // Sequences continue after the fixture ids
    let next_user: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, email) VALUES ('newcomer', 'newcomer@yamdb.fake') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(next_user, 102);

    let next_genre: i64 =
        sqlx::query_scalar("INSERT INTO genres (name, slug) VALUES ('Триллер', 'thriller') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(next_genre, 3);

    teardown(url, pool).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_second_load_is_noop() {
    let (url, pool) = scratch_database("twice").await;
    let dir = fixture_dir();
    let fixtures = Fixtures::read_dir(dir.path()).unwrap();

    load(&pool, &fixtures).await.unwrap();
    let outcome = load(&pool, &fixtures).await.unwrap();
    assert_eq!(outcome, LoadOutcome::AlreadyPopulated { table: "users" });

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 2);

    teardown(url, pool).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_broken_reference_rolls_back() {
    let (url, pool) = scratch_database("rollback").await;
    let dir = fixture_dir();
    let mut fixtures = Fixtures::read_dir(dir.path()).unwrap();
    fixtures.comments[0].review_id = 999;

    let result = load(&pool, &fixtures).await;
    assert!(matches!(result, Err(LoadError::Database(_))));

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 0);

    teardown(url, pool).await;
}
