//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::MySqlPool;

use crate::config::ServerConfig;
use crate::services::{AuthService, AuthSettings, EmailService, JwtKeys, TerritoryService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: MySqlPool,
    jwt: JwtKeys,
    email: EmailService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `MySQL` connection pool
    /// * `email` - Outgoing mail, SMTP or log-only
    #[must_use]
    pub fn new(config: ServerConfig, pool: MySqlPool, email: EmailService) -> Self {
        let jwt = JwtKeys::new(&config.jwt.secret, config.jwt.expires_in);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                email,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.inner.pool
    }

    /// Get a reference to the token signing keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Authentication service over this state's resources.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        let config = self.config();
        AuthService::new(
            self.pool(),
            self.jwt(),
            self.email(),
            AuthSettings {
                session_max_age: config.session.max_age(),
                reset_ttl: config.password_reset_ttl,
            },
        )
    }

    /// Territory service over this state's pool.
    #[must_use]
    pub fn territories(&self) -> TerritoryService<'_> {
        TerritoryService::new(self.pool())
    }
}
