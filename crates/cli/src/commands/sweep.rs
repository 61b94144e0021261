//! One-off removal of expired sessions and reset tokens.

use chrono::Utc;
use sqlx::MySqlPool;

use territory_server::services::maintenance::sweep_expired;

use super::CommandError;

/// Run a single sweep and log what was removed.
///
/// # Errors
///
/// Returns `CommandError::Repository` if a delete fails.
pub async fn run(pool: &MySqlPool) -> Result<(), CommandError> {
    let report = sweep_expired(pool, Utc::now()).await?;
    tracing::info!(
        sessions = report.sessions,
        reset_tokens = report.reset_tokens,
        "Removed expired rows"
    );
    Ok(())
}
