//! Account management.

use sqlx::MySqlPool;

use territory_core::{Email, UserId};
use territory_server::db::{RepositoryError, UserRepository};
use territory_server::services::auth::{hash_password, validate_password};

use super::CommandError;

/// Create an account, optionally with a confirmed address.
///
/// # Errors
///
/// Returns `CommandError::Invalid` for a bad email, a password of the wrong
/// length or an address that is already registered.
pub async fn create(
    pool: &MySqlPool,
    email: &str,
    password: &str,
    verified: bool,
) -> Result<UserId, CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::Invalid(e.to_string()))?;
    validate_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let hash = hash_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let users = UserRepository::new(pool);
    let user = users.create(&email, &hash).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => {
            CommandError::Invalid(format!("a user already exists with email {email}"))
        }
        other => CommandError::Repository(other),
    })?;

    if verified {
        users.set_email_verified(user.id).await?;
    }

    tracing::info!(user_id = %user.id, email = %user.email, verified, "User created");
    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn offline_pool() -> MySqlPool {
        MySqlPool::connect_lazy("mysql://u:p@127.0.0.1:9/none").unwrap()
    }

    #[tokio::test]
    async fn test_password_length_checked_like_the_api() {
        let pool = offline_pool();

        let short = create(&pool, "someone@territoires.fr", "short", false).await;
        assert!(matches!(short, Err(CommandError::Invalid(msg)) if msg.contains("at least 8")));

        let long = "x".repeat(257);
        let long = create(&pool, "someone@territoires.fr", &long, false).await;
        assert!(matches!(long, Err(CommandError::Invalid(msg)) if msg.contains("at most 256")));
    }

    #[tokio::test]
    async fn test_bad_email_rejected() {
        let result = create(&offline_pool(), "nobody", "long enough password", false).await;
        assert!(matches!(result, Err(CommandError::Invalid(_))));
    }
}
