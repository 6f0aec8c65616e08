//! # YaMDb API Server Library
//!
//! HTTP API for collecting reviews of titles (films, books, music) and
//! comments on those reviews.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response headers
//! - `pagination`: Page-number pagination for list endpoints
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pagination;
pub mod routes;
