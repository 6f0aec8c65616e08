//! Fixture files
//!
//! A fixture directory holds one file per table, either CSV with a header
//! row or a JSON array of objects. Every record carries its primary key so
//! references between files resolve without lookups.
//!
//! | fixture       | record               |
//! |---------------|----------------------|
//! | `users`       | [`UserRecord`]       |
//! | `category`    | [`TermRecord`]       |
//! | `genre`       | [`TermRecord`]       |
//! | `titles`      | [`TitleRecord`]      |
//! | `genre_title` | [`GenreTitleRecord`] |
//! | `review`      | [`ReviewRecord`]     |
//! | `comments`    | [`CommentRecord`]    |
//!
//! `<fixture>.csv` wins over `<fixture>.json` when both exist. A missing
//! fixture loads as an empty table, but a directory without any fixture is
//! an error.

use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use yamdb_shared::models::user::UserRole;

use crate::loader::LoadError;

pub const USERS_FIXTURE: &str = "users";
pub const CATEGORIES_FIXTURE: &str = "category";
pub const GENRES_FIXTURE: &str = "genre";
pub const TITLES_FIXTURE: &str = "titles";
pub const GENRE_TITLES_FIXTURE: &str = "genre_title";
pub const REVIEWS_FIXTURE: &str = "review";
pub const COMMENTS_FIXTURE: &str = "comments";

/// Every fixture name, in load order
pub const FIXTURES: &[&str] = &[
    USERS_FIXTURE,
    CATEGORIES_FIXTURE,
    GENRES_FIXTURE,
    TITLES_FIXTURE,
    GENRE_TITLES_FIXTURE,
    REVIEWS_FIXTURE,
    COMMENTS_FIXTURE,
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// A category or a genre
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TitleRecord {
    pub id: i64,
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub description: Option<String>,
    /// Category id
    #[serde(default, alias = "category_id")]
    pub category: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenreTitleRecord {
    pub id: i64,
    pub title_id: i64,
    pub genre_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub title_id: i64,
    /// Author's user id
    #[serde(alias = "author_id")]
    pub author: i64,
    pub text: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub review_id: i64,
    /// Author's user id
    #[serde(alias = "author_id")]
    pub author: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

/// Everything read from one fixture directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixtures {
    pub users: Vec<UserRecord>,
    pub categories: Vec<TermRecord>,
    pub genres: Vec<TermRecord>,
    pub titles: Vec<TitleRecord>,
    pub genre_titles: Vec<GenreTitleRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub comments: Vec<CommentRecord>,
}

impl Fixtures {
    /// Reads every fixture in `dir`
    ///
    /// # Errors
    ///
    /// - `LoadError::MissingDirectory` if `dir` is not a directory
    /// - `LoadError::NoFixtures` if `dir` holds none of the fixture files
    /// - `Io`, `Csv` or `Parse` for an unreadable or malformed file
    pub fn read_dir(dir: &Path) -> Result<Self, LoadError> {
        if !dir.is_dir() {
            return Err(LoadError::MissingDirectory(dir.to_path_buf()));
        }

        let users = read_fixture(dir, USERS_FIXTURE)?;
        let categories = read_fixture(dir, CATEGORIES_FIXTURE)?;
        let genres = read_fixture(dir, GENRES_FIXTURE)?;
        let titles = read_fixture(dir, TITLES_FIXTURE)?;
        let genre_titles = read_fixture(dir, GENRE_TITLES_FIXTURE)?;
        let reviews = read_fixture(dir, REVIEWS_FIXTURE)?;
        let comments = read_fixture(dir, COMMENTS_FIXTURE)?;

        let found = [
            users.is_some(),
            categories.is_some(),
            genres.is_some(),
            titles.is_some(),
            genre_titles.is_some(),
            reviews.is_some(),
            comments.is_some(),
        ];
        if !found.contains(&true) {
            return Err(LoadError::NoFixtures(dir.to_path_buf()));
        }

        Ok(Self {
            users: users.unwrap_or_default(),
            categories: categories.unwrap_or_default(),
            genres: genres.unwrap_or_default(),
            titles: titles.unwrap_or_default(),
            genre_titles: genre_titles.unwrap_or_default(),
            reviews: reviews.unwrap_or_default(),
            comments: comments.unwrap_or_default(),
        })
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.users.len()
            + self.categories.len()
            + self.genres.len()
            + self.titles.len()
            + self.genre_titles.len()
            + self.reviews.len()
            + self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads `<name>.csv`, falling back to `<name>.json`; `None` when neither exists
fn read_fixture<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Option<Vec<T>>, LoadError> {
    let csv_path = dir.join(format!("{name}.csv"));
    let json_path = dir.join(format!("{name}.json"));

    let records: Vec<T> = if csv_path.is_file() {
        read_csv(&csv_path)?
    } else if json_path.is_file() {
        read_json(&json_path)?
    } else {
        tracing::warn!(fixture = name, dir = %dir.display(), "Fixture file missing, loading no rows");
        return Ok(None);
    };

    tracing::debug!(fixture = name, records = records.len(), "Fixture read");
    Ok(Some(records))
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(csv_error)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
