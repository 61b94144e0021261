//! Subcommand implementations.

pub mod migrate;
pub mod sweep;
pub mod user;

use secrecy::{ExposeSecret, SecretString};
use sqlx::MySqlPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository error.
    #[error("{0}")]
    Repository(#[from] territory_server::db::RepositoryError),

    /// Invalid input.
    #[error("{0}")]
    Invalid(String),
}

/// Connect to the database named by `TERRITORY_DATABASE_URL` or `DATABASE_URL`.
///
/// # Errors
///
/// Returns `CommandError::MissingEnvVar` if neither is set.
pub async fn connect() -> Result<MySqlPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TERRITORY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("TERRITORY_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = MySqlPool::connect(database_url.expose_secret()).await?;
    Ok(pool)
}
