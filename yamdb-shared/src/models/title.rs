//! Title model and database operations
//!
//! A title is a reviewed work. It belongs to at most one category and to any
//! number of genres (through the `title_genres` join table). Its rating is
//! never stored: it is the average score of its reviews, computed on read,
//! and `None` while the title has no reviews.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE titles (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(256) NOT NULL,
//!     year INTEGER NOT NULL,
//!     description TEXT,
//!     category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL
//! );
//!
//! CREATE TABLE title_genres (
//!     id BIGSERIAL PRIMARY KEY,
//!     title_id BIGINT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
//!     genre_id BIGINT NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
//!     CONSTRAINT unique_title_genre UNIQUE (title_id, genre_id)
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use yamdb_shared::models::title::{CreateTitle, Title, TitleFilter};
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! let title = Title::create(&pool, CreateTitle {
//!     name: "Solaris".to_string(),
//!     year: 1972,
//!     description: None,
//!     category_id: None,
//!     genre_ids: vec![],
//! }).await?;
//!
//! let filter = TitleFilter { year: Some(1972), ..Default::default() };
//! let titles = Title::list(&pool, &filter, 10, 0).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{like_pattern, taxonomy::Term};

const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
           (SELECT AVG(r.score)::DOUBLE PRECISION FROM reviews r WHERE r.title_id = t.id) AS rating
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
    WHERE 1=1"#;

const TITLE_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
    WHERE 1=1"#;

/// A title with its category, genres and derived rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub id: i64,

    pub name: String,

    /// Release year
    pub year: i32,

    pub description: Option<String>,

    /// Average review score, `None` until the first review
    pub rating: Option<f64>,

    pub category: Option<Term>,

    /// Genres ordered by slug
    pub genres: Vec<Term>,
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TitleRow {
    id: i64,
    name: String,
    year: i32,
    description: Option<String>,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_slug: Option<String>,
    rating: Option<f64>,
}

impl TitleRow {
    fn into_title(self, genres: Vec<Term>) -> Title {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Term { id, name, slug }),
            _ => None,
        };

        Title {
            id: self.id,
            name: self.name,
            year: self.year,
            description: self.description,
            rating: self.rating,
            category,
            genres,
        }
    }
}

/// Input for creating a title
///
/// Category and genres are given as ids; resolving slugs is the caller's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub genre_ids: Vec<i64>,
}

/// Input for updating a title
///
/// `None` leaves a field untouched. `Some(None)` clears a nullable field.
/// `genre_ids: Some(..)` replaces the whole genre set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTitle {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<i64>>,
    pub genre_ids: Option<Vec<i64>>,
}

impl UpdateTitle {
    fn has_column_changes(&self) -> bool {
        self.name.is_some() || self.year.is_some() || self.description.is_some() || self.category_id.is_some()
    }
}

/// Filters for listing titles; all present filters must match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,

    /// Exact release year
    pub year: Option<i32>,

    /// Category slug
    pub category: Option<String>,

    /// Genre slug; matches titles having that genre among others
    pub genre: Option<String>,
}

impl Title {
    /// Creates a title and links its genres in one transaction
    ///
    /// Duplicate genre ids are collapsed.
    ///
    /// # Errors
    ///
    /// Fails on foreign key violations if the category or a genre id does not
    /// exist.
    pub async fn create(pool: &PgPool, data: CreateTitle) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO titles (name, year, description, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&data.name)
        .bind(data.year)
        .bind(&data.description)
        .bind(data.category_id)
        .fetch_one(&mut *tx)
        .await?;

        link_genres(&mut tx, id, &data.genre_ids).await?;

        tx.commit().await?;

        tracing::info!(title_id = id, name = %data.name, "Title created");

        Self::find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a title by ID, with category, genres and rating
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(TITLE_SELECT);
        query.push(" AND t.id = ").push_bind(id);

        let Some(row) = query.build_query_as::<TitleRow>().fetch_optional(pool).await? else {
            return Ok(None);
        };

        let mut genres = load_genres(pool, &[row.id]).await?;
        let title_genres = genres.remove(&row.id).unwrap_or_default();

        Ok(Some(row.into_title(title_genres)))
    }

    /// Checks whether a title exists
    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM titles WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Lists titles matching `filter`, ordered by name
    pub async fn list(
        pool: &PgPool,
        filter: &TitleFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(TITLE_SELECT);
        apply_filter(&mut query, filter);
        query
            .push(" ORDER BY t.name, t.id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = query.build_query_as::<TitleRow>().fetch_all(pool).await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut genres = load_genres(pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let title_genres = genres.remove(&row.id).unwrap_or_default();
                row.into_title(title_genres)
            })
            .collect())
    }

    /// Counts titles matching `filter`
    pub async fn count(pool: &PgPool, filter: &TitleFilter) -> Result<i64, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(TITLE_COUNT);
        apply_filter(&mut query, filter);

        query.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Updates a title
    ///
    /// # Returns
    ///
    /// The updated title, or None if it does not exist
    pub async fn update(pool: &PgPool, id: i64, data: UpdateTitle) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM titles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        if data.has_column_changes() {
            let mut query = QueryBuilder::<Postgres>::new("UPDATE titles SET ");
            let mut columns = query.separated(", ");
            if let Some(name) = data.name {
                columns.push("name = ").push_bind_unseparated(name);
            }
            if let Some(year) = data.year {
                columns.push("year = ").push_bind_unseparated(year);
            }
            if let Some(description) = data.description {
                columns.push("description = ").push_bind_unseparated(description);
            }
            if let Some(category_id) = data.category_id {
                columns.push("category_id = ").push_bind_unseparated(category_id);
            }
            query.push(" WHERE id = ").push_bind(id);
            query.build().execute(&mut *tx).await?;
        }

        if let Some(genre_ids) = data.genre_ids {
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_genres(&mut tx, id, &genre_ids).await?;
        }

        tx.commit().await?;

        tracing::info!(title_id = id, "Title updated");
        Self::find_by_id(pool, id).await
    }

    /// Deletes a title together with its reviews and their comments
    ///
    /// # Returns
    ///
    /// True if the title was deleted
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn link_genres(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), sqlx::Error> {
    if genre_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO title_genres (title_id, genre_id)
        SELECT $1, genre_id FROM UNNEST($2::BIGINT[]) AS genre_id
        ON CONFLICT (title_id, genre_id) DO NOTHING
        "#,
    )
    .bind(title_id)
    .bind(genre_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn load_genres(pool: &PgPool, title_ids: &[i64]) -> Result<HashMap<i64, Vec<Term>>, sqlx::Error> {
    if title_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, i64, String, String)> = sqlx::query_as(
        r#"
        SELECT tg.title_id, g.id, g.name, g.slug
        FROM title_genres tg
        JOIN genres g ON g.id = tg.genre_id
        WHERE tg.title_id = ANY($1)
        ORDER BY g.slug
        "#,
    )
    .bind(title_ids)
    .fetch_all(pool)
    .await?;

    let mut genres: HashMap<i64, Vec<Term>> = HashMap::new();
    for (title_id, id, name, slug) in rows {
        genres.entry(title_id).or_default().push(Term { id, name, slug });
    }
    Ok(genres)
}

fn apply_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    if let Some(name) = filter.name.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND t.name ILIKE ").push_bind(like_pattern(name));
    }
    if let Some(year) = filter.year {
        query.push(" AND t.year = ").push_bind(year);
    }
    if let Some(category) = filter.category.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND c.slug = ").push_bind(category.to_string());
    }
    if let Some(genre) = filter.genre.as_deref().filter(|s| !s.is_empty()) {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
                 WHERE tg.title_id = t.id AND g.slug = ",
            )
            .push_bind(genre.to_string())
            .push(")");
    }
}
