//! Seeds an empty database from [`Fixtures`]
//!
//! The load is all or nothing: records are checked up front, then every
//! table is written inside one transaction. Afterwards each id sequence is
//! moved past the highest loaded id so rows created later through the API
//! do not collide with fixture ids.
//!
//! A database that already holds any row in any target table is left alone.

use std::path::PathBuf;

use sqlx::{query_builder::Separated, PgPool, Postgres, QueryBuilder, Transaction};
use yamdb_shared::validation::{validate_score, validate_slug, validate_username, validate_year};

use crate::fixtures::{
    Fixtures, CATEGORIES_FIXTURE, COMMENTS_FIXTURE, GENRES_FIXTURE, REVIEWS_FIXTURE, TITLES_FIXTURE,
    USERS_FIXTURE,
};

/// Target tables in insertion order
pub const TABLES: &[&str] = &[
    "users",
    "categories",
    "genres",
    "titles",
    "title_genres",
    "reviews",
    "comments",
];

/// Rows per INSERT statement; keeps bind parameters under the protocol limit
const BATCH_SIZE: usize = 1000;

/// Error type for loading fixtures
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Fixture directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No fixture files found in {}", .0.display())]
    NoFixtures(PathBuf),

    #[error("Malformed JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("Invalid record {id} in {fixture}: {message}")]
    Invalid {
        fixture: &'static str,
        id: i64,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of a load attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Some table already had rows; nothing was written
    AlreadyPopulated { table: &'static str },

    /// All records were inserted
    Loaded { records: usize },
}

/// First target table that holds at least one row
pub async fn populated_table(pool: &PgPool) -> Result<Option<&'static str>, sqlx::Error> {
    for &table in TABLES {
        let exists: bool = sqlx::query_scalar(&format!("SELECT EXISTS (SELECT 1 FROM {table})"))
            .fetch_one(pool)
            .await?;
        if exists {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

/// Checks record formats before anything is written
///
/// References between records are left to the foreign keys.
pub fn validate(fixtures: &Fixtures) -> Result<(), LoadError> {
    let invalid = |fixture: &'static str, id: i64, err: validator::ValidationError| LoadError::Invalid {
        fixture,
        id,
        message: err
            .message
            .map(|m| m.into_owned())
            .unwrap_or_else(|| err.code.into_owned()),
    };

    for user in &fixtures.users {
        validate_username(&user.username).map_err(|e| invalid(USERS_FIXTURE, user.id, e))?;
        if user.email.is_empty() {
            return Err(LoadError::Invalid {
                fixture: USERS_FIXTURE,
                id: user.id,
                message: "Email is empty".to_string(),
            });
        }
    }
    for category in &fixtures.categories {
        validate_slug(&category.slug).map_err(|e| invalid(CATEGORIES_FIXTURE, category.id, e))?;
    }
    for genre in &fixtures.genres {
        validate_slug(&genre.slug).map_err(|e| invalid(GENRES_FIXTURE, genre.id, e))?;
    }
    for title in &fixtures.titles {
        validate_year(title.year).map_err(|e| invalid(TITLES_FIXTURE, title.id, e))?;
    }
    for review in &fixtures.reviews {
        validate_score(review.score).map_err(|e| invalid(REVIEWS_FIXTURE, review.id, e))?;
    }
    for comment in &fixtures.comments {
        if comment.text.is_empty() {
            return Err(LoadError::Invalid {
                fixture: COMMENTS_FIXTURE,
                id: comment.id,
                message: "Text is empty".to_string(),
            });
        }
    }

    Ok(())
}

/// Loads `fixtures` unless the database already has data
pub async fn load(pool: &PgPool, fixtures: &Fixtures) -> Result<LoadOutcome, LoadError> {
    if let Some(table) = populated_table(pool).await? {
        tracing::info!(table, "Database already populated, nothing loaded");
        return Ok(LoadOutcome::AlreadyPopulated { table });
    }

    validate(fixtures)?;

    let mut tx = pool.begin().await?;

    insert_batched(
        &mut tx,
        "INSERT INTO users (id, username, email, role, bio, first_name, last_name) ",
        &fixtures.users,
        |mut row, user| {
            row.push_bind(user.id)
                .push_bind(&user.username)
                .push_bind(&user.email)
                .push_bind(user.role)
                .push_bind(&user.bio)
                .push_bind(&user.first_name)
                .push_bind(&user.last_name);
        },
    )
    .await?;

    for (table, terms) in [("categories", &fixtures.categories), ("genres", &fixtures.genres)] {
        let head = match table {
            "categories" => "INSERT INTO categories (id, name, slug) ",
            _ => "INSERT INTO genres (id, name, slug) ",
        };
        insert_batched(&mut tx, head, terms, |mut row, term| {
            row.push_bind(term.id).push_bind(&term.name).push_bind(&term.slug);
        })
        .await?;
    }

    insert_batched(
        &mut tx,
        "INSERT INTO titles (id, name, year, description, category_id) ",
        &fixtures.titles,
        |mut row, title| {
            row.push_bind(title.id)
                .push_bind(&title.name)
                .push_bind(title.year)
                .push_bind(&title.description)
                .push_bind(title.category);
        },
    )
    .await?;

    insert_batched(
        &mut tx,
        "INSERT INTO title_genres (id, title_id, genre_id) ",
        &fixtures.genre_titles,
        |mut row, link| {
            row.push_bind(link.id).push_bind(link.title_id).push_bind(link.genre_id);
        },
    )
    .await?;

    insert_batched(
        &mut tx,
        "INSERT INTO reviews (id, title_id, author_id, text, score, pub_date) ",
        &fixtures.reviews,
        |mut row, review| {
            row.push_bind(review.id)
                .push_bind(review.title_id)
                .push_bind(review.author)
                .push_bind(&review.text)
                .push_bind(review.score)
                .push_bind(review.pub_date);
        },
    )
    .await?;

    insert_batched(
        &mut tx,
        "INSERT INTO comments (id, review_id, author_id, text, pub_date) ",
        &fixtures.comments,
        |mut row, comment| {
            row.push_bind(comment.id)
                .push_bind(comment.review_id)
                .push_bind(comment.author)
                .push_bind(&comment.text)
                .push_bind(comment.pub_date);
        },
    )
    .await?;

    for table in TABLES {
        reset_sequence(&mut tx, table).await?;
    }

    tx.commit().await?;

    let records = fixtures.len();
    tracing::info!(
        records,
        users = fixtures.users.len(),
        titles = fixtures.titles.len(),
        reviews = fixtures.reviews.len(),
        comments = fixtures.comments.len(),
        "Fixtures loaded"
    );
    Ok(LoadOutcome::Loaded { records })
}

async fn insert_batched<'a, T, F>(
    tx: &mut Transaction<'_, Postgres>,
    head: &'static str,
    rows: &'a [T],
    mut bind: F,
) -> Result<(), sqlx::Error>
where
    F: FnMut(Separated<'_, 'a, Postgres, &'static str>, &'a T),
{
    for chunk in rows.chunks(BATCH_SIZE) {
        let mut query = QueryBuilder::<Postgres>::new(head);
        query.push_values(chunk, &mut bind);
        query.build().execute(&mut **tx).await?;
    }
    Ok(())
}

/// Next id handed out by `table`'s sequence becomes `MAX(id) + 1`
async fn reset_sequence(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
    ))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{CommentRecord, ReviewRecord, TermRecord, TitleRecord, UserRecord};
    use chrono::Utc;
    use yamdb_shared::models::user::UserRole;

    fn sample() -> Fixtures {
        Fixtures {
            users: vec![UserRecord {
                id: 100,
                username: "bingobongo".to_string(),
                email: "bingobongo@yamdb.fake".to_string(),
                role: UserRole::User,
                bio: String::new(),
                first_name: String::new(),
                last_name: String::new(),
            }],
            categories: vec![TermRecord {
                id: 1,
                name: "Фильм".to_string(),
                slug: "movie".to_string(),
            }],
            titles: vec![TitleRecord {
                id: 1,
                name: "Побег из Шоушенка".to_string(),
                year: 1994,
                description: None,
                category: Some(1),
            }],
            reviews: vec![ReviewRecord {
                id: 1,
                title_id: 1,
                author: 100,
                text: "Ничего особенного".to_string(),
                score: 10,
                pub_date: Utc::now(),
            }],
            comments: vec![CommentRecord {
                id: 1,
                review_id: 1,
                author: 100,
                text: "Согласен".to_string(),
                pub_date: Utc::now(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_fixtures_pass() {
        assert!(validate(&sample()).is_ok());
    }

    #[test]
    fn test_bad_slug_names_file_and_id() {
        let mut fixtures = sample();
        fixtures.categories[0].slug = "not a slug".to_string();

        match validate(&fixtures) {
            Err(LoadError::Invalid { fixture, id, .. }) => {
                assert_eq!(fixture, CATEGORIES_FIXTURE);
                assert_eq!(id, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let mut fixtures = sample();
        fixtures.reviews[0].score = 0;
        assert!(matches!(
            validate(&fixtures),
            Err(LoadError::Invalid { fixture: REVIEWS_FIXTURE, .. })
        ));
    }

    #[test]
    fn test_reserved_username_rejected() {
        let mut fixtures = sample();
        fixtures.users[0].username = "me".to_string();
        assert!(matches!(
            validate(&fixtures),
            Err(LoadError::Invalid { fixture: USERS_FIXTURE, id: 100, .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = LoadError::MissingDirectory(PathBuf::from("/nowhere"));
        assert_eq!(err.to_string(), "Fixture directory /nowhere does not exist");

        let err = LoadError::Invalid {
            fixture: TITLES_FIXTURE,
            id: 3,
            message: "Year cannot be later than 2024".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid record 3 in titles"));
    }

    #[test]
    fn test_tables_in_dependency_order() {
        let position = |name: &str| TABLES.iter().position(|t| *t == name).unwrap();
        assert!(position("users") < position("reviews"));
        assert!(position("titles") < position("title_genres"));
        assert!(position("reviews") < position("comments"));
    }
}
