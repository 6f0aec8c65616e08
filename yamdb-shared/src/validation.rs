//! Field format checks shared by the API and the loader
//!
//! Length, email and range rules are declared with `#[derive(Validate)]` on
//! the request types. The checks here need a regex, a reserved word or the
//! current date, so they are plain functions whose errors are folded into
//! the same [`ValidationErrors`] with [`with_checks`].

use std::borrow::Cow;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::{ValidationError, ValidationErrors};

use crate::models::review::{MAX_SCORE, MIN_SCORE};

/// Usernames that collide with routes
pub const RESERVED_USERNAMES: &[&str] = &["me"];

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+\z").expect("valid regex"));

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+\z").expect("valid regex"));

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Letters, digits and `.@+-_` only; never a reserved name
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_RE.is_match(username) {
        return Err(error(
            "username_format",
            "Username may contain only letters, digits and @/./+/-/_",
        ));
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(error(
            "username_reserved",
            format!("Username '{username}' is reserved"),
        ));
    }
    Ok(())
}

/// ASCII letters, digits, hyphens and underscores
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err(error(
            "slug_format",
            "Slug may contain only latin letters, digits, hyphens and underscores",
        ))
    }
}

/// Release year may not lie in the future
pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    let current = Utc::now().year();
    if year > current {
        Err(error(
            "year_in_future",
            format!("Year cannot be later than {current}"),
        ))
    } else {
        Ok(())
    }
}

/// Review scores run from 1 to 10
pub fn validate_score(score: i16) -> Result<(), ValidationError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(error(
            "score_range",
            format!("Score must be between {MIN_SCORE} and {MAX_SCORE}"),
        ))
    }
}

/// Fails for a field left out of the payload
pub fn require_present<T>(value: &Option<T>) -> Result<(), ValidationError> {
    match value {
        Some(_) => Ok(()),
        None => Err(error("required", "This field is required")),
    }
}

/// Folds extra field checks into the result of a derived `validate()`
///
/// # Example
///
/// ```
/// use yamdb_shared::validation::{validate_slug, with_checks};
///
/// let result = with_checks(Ok(()), [("slug", validate_slug("not a slug"))]);
/// assert!(result.unwrap_err().field_errors().contains_key("slug"));
/// ```
pub fn with_checks<I>(base: Result<(), ValidationErrors>, checks: I) -> Result<(), ValidationErrors>
where
    I: IntoIterator<Item = (&'static str, Result<(), ValidationError>)>,
{
    let mut errors = base.err().unwrap_or_else(ValidationErrors::new);
    for (field, check) in checks {
        if let Err(err) = check {
            errors.add(field, err);
        }
    }

    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
