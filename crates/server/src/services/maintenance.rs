//! Periodic removal of expired sessions and password reset tokens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use tokio::task::JoinHandle;

use crate::db::{PasswordResetTokenRepository, RepositoryError, SessionRepository};

/// Rows removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: u64,
    pub reset_tokens: u64,
}

/// Delete sessions and reset tokens that expired before `now`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a delete fails.
pub async fn sweep_expired(
    pool: &MySqlPool,
    now: DateTime<Utc>,
) -> Result<SweepReport, RepositoryError> {
    let sessions = SessionRepository::new(pool).delete_expired(now).await?;
    let reset_tokens = PasswordResetTokenRepository::new(pool)
        .delete_expired(now)
        .await?;

    Ok(SweepReport {
        sessions,
        reset_tokens,
    })
}

/// Run [`sweep_expired`] every `period` until the task is aborted.
///
/// The first sweep runs immediately. Failures are logged and retried on the
/// next tick.
#[must_use]
pub fn spawn_sweeper(pool: MySqlPool, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match sweep_expired(&pool, Utc::now()).await {
                Ok(report) if report == SweepReport::default() => {
                    tracing::debug!("Sweep found nothing to remove");
                }
                Ok(report) => {
                    tracing::info!(
                        sessions = report.sessions,
                        reset_tokens = report.reset_tokens,
                        "Removed expired rows"
                    );
                }
                Err(e) => tracing::warn!(error = %e, "Expired row sweep failed"),
            }
        }
    })
}
