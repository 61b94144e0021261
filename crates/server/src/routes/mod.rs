//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Readiness (database)
//!
//! # Auth credentials (rate limited)
//! POST   /api/auth/register                   - Create account, mail confirmation
//! POST   /api/auth/login                      - Open session, set cookie
//! POST   /api/auth/confirm-email              - Confirm address from emailed token
//! POST   /api/auth/resend-confirmation        - Mail a new confirmation link
//! POST   /api/auth/forgot-password            - Mail a reset link
//! POST   /api/auth/reset-password             - Set password from reset token
//! POST   /api/auth/change-password            - Change password (logged in)
//!
//! # Auth session
//! GET    /api/auth/me                         - Current user
//! POST   /api/auth/refresh                    - Rotate session token
//! POST   /api/auth/logout                     - Close session, clear cookie
//!
//! # Territories (requires auth)
//! GET    /api/territories                     - List (?miniatures=true)
//! POST   /api/territories                     - Create
//! GET    /api/territories/{num}               - Show
//! PUT    /api/territories/{num}               - Partial update
//! DELETE /api/territories/{num}               - Delete with images
//! GET    /api/territories/{num}/frame         - Map frame for image generation
//! PUT    /api/territories/{num}/images/{kind} - Upload miniature / full image
//! GET    /api/territories/{num}/images/{kind} - Download image
//! DELETE /api/territories/{num}/images/{kind} - Delete image
//!
//! # Settings (requires auth)
//! GET    /api/config                          - Image generation settings
//! PUT    /api/config                          - Save image generation settings
//! ```

pub mod auth;
pub mod config;
pub mod health;
pub mod territories;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Auth routes that take credentials or emailed tokens.
///
/// These are the ones worth rate limiting.
pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/confirm-email", post(auth::confirm_email))
        .route("/resend-confirmation", post(auth::resend_confirmation))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/change-password", post(auth::change_password))
}

/// Auth routes the frontend calls on every page load.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(auth::me))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
}

/// Create the territory routes router.
///
/// Image uploads may be up to `max_image_bytes`.
pub fn territory_routes(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(territories::index).post(territories::create))
        .route(
            "/{num}",
            get(territories::show)
                .put(territories::update)
                .delete(territories::destroy),
        )
        .route("/{num}/frame", get(territories::frame))
        .route(
            "/{num}/images/{kind}",
            put(territories::put_image)
                .get(territories::get_image)
                .delete(territories::delete_image)
                .layer(DefaultBodyLimit::max(max_image_bytes)),
        )
}

/// Create the settings routes router.
pub fn config_routes() -> Router<AppState> {
    Router::new().route("/", get(config::show).put(config::update))
}

/// Create all API routes except auth, which is layered separately.
pub fn routes(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/territories", territory_routes(max_image_bytes))
        .nest("/api/config", config_routes())
}
