//! Configuration management for the API server
//!
//! Loaded from environment variables (and a `.env` file when present).
//!
//! # Environment Variables
//!
//! - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
//! - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
//! - `PRODUCTION`: Enables HSTS (default: false)
//! - `PAGE_SIZE`: Items per page on list endpoints, 1..=100 (default: 10)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `RUN_MIGRATIONS`: Apply migrations at startup (default: true)
//! - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
//! - `JWT_ACCESS_TTL_HOURS`: Access token lifetime (default: 24)
//! - `CONFIRMATION_CODE_TTL_MINUTES`: Signup code lifetime (default: 60)
//! - `RUST_LOG` / `LOG_FORMAT`: Log filter and `json` output
//!
//! SMTP settings are read separately by [`yamdb_shared::mail::MailConfig`].
//!
//! # Example
//!
//! ```no_run
//! use yamdb_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (adds Strict-Transport-Security)
    pub production: bool,

    /// Items per page on list endpoints
    pub page_size: u32,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be kept secret and at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Access token lifetime in hours
    pub access_ttl_hours: i64,
}

/// Signup flow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Confirmation code lifetime in minutes
    pub confirmation_code_ttl_minutes: i64,
}

/// Longest accepted access token lifetime (one year)
pub const MAX_ACCESS_TTL_HOURS: i64 = 365 * 24;

/// Longest accepted confirmation code lifetime (one year)
pub const MAX_CONFIRMATION_CODE_TTL_MINUTES: i64 = 365 * 24 * 60;

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} has an invalid value '{raw}': {e}")),
        _ => Ok(default),
    }
}

fn parse_bool(name: &str, default: bool) -> anyhow::Result<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{name} must be a boolean, got '{other}'"),
        },
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse or is out of range.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let config = Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("API_PORT", 8080)?,
                cors_origins: parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
                production: parse_bool("PRODUCTION", false)?,
                page_size: parse_var("PAGE_SIZE", 10)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
                run_migrations: parse_bool("RUN_MIGRATIONS", true)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_hours: parse_var("JWT_ACCESS_TTL_HOURS", 24)?,
            },
            auth: AuthConfig {
                confirmation_code_ttl_minutes: parse_var("CONFIRMATION_CODE_TTL_MINUTES", 60)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        if !(1..=100).contains(&self.api.page_size) {
            anyhow::bail!("PAGE_SIZE must be between 1 and 100");
        }
        if !(1..=MAX_ACCESS_TTL_HOURS).contains(&self.jwt.access_ttl_hours) {
            anyhow::bail!("JWT_ACCESS_TTL_HOURS must be between 1 and {MAX_ACCESS_TTL_HOURS}");
        }
        if !(1..=MAX_CONFIRMATION_CODE_TTL_MINUTES).contains(&self.auth.confirmation_code_ttl_minutes) {
            anyhow::bail!("CONFIRMATION_CODE_TTL_MINUTES must be between 1 and {MAX_CONFIRMATION_CODE_TTL_MINUTES}");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be positive");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// True when any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}
