//! # YaMDb Shared Library
//!
//! Types, queries and business rules used by the YaMDb API server and the
//! fixture loader.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `auth`: Confirmation codes, JWT, bearer authentication, access policies
//! - `db`: Connection pool and migrations
//! - `mail`: Outgoing email
//! - `validation`: Field format checks

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod validation;

/// Current version of the YaMDb shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
