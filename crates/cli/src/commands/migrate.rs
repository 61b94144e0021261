//! Database migrations.
//!
//! Migration files live in `crates/server/migrations/` and are embedded at
//! compile time.

use sqlx::MySqlPool;

use super::CommandError;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `CommandError::Migration` if a migration fails.
pub async fn run(pool: &MySqlPool) -> Result<(), CommandError> {
    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
