//! Database operations for the territory `MySQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts (email, Argon2 password hash, verification flag)
//! - `sessions` - Server-side sessions keyed by the signed session token
//! - `password_reset_tokens` - SHA-256 digests of emailed reset tokens
//! - `territories` - Territory outlines, rotation and derived bounding box
//! - `territory_images` - Generated miniature / full map images
//! - `user_configs` - Per-user image generation settings (JSON)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p territory-cli -- migrate
//! ```

pub mod password_reset_tokens;
pub mod sessions;
pub mod territories;
pub mod user_configs;
pub mod users;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use thiserror::Error;

pub use password_reset_tokens::PasswordResetTokenRepository;
pub use sessions::SessionRepository;
pub use territories::TerritoryRepository;
pub use user_configs::UserConfigRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-key violation to `Conflict`, anything else to `Database`.
    pub(crate) fn on_unique(what: &str) -> impl FnOnce(sqlx::Error) -> Self + '_ {
        move |e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return Self::Conflict(format!("{what} already exists"));
            }
            Self::Database(e)
        }
    }
}

/// Create a `MySQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<MySqlPool, sqlx::Error> {
    pool_options()
        .connect(database_url.expose_secret())
        .await
}

/// Create a pool that connects on first use.
///
/// Used by tests and tooling that build the router without a live database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &SecretString) -> Result<MySqlPool, sqlx::Error> {
    pool_options().connect_lazy(database_url.expose_secret())
}

fn pool_options() -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(10)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(10))
}
