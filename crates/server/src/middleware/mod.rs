//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (frontend origin with credentials)
//! 5. Rate limiting on `/api/auth` (governor)

pub mod auth;
pub mod cookies;
pub mod locale;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireAuth;
pub use cookies::{SESSION_COOKIE, clear_session_cookie, read_session_cookie, set_session_cookie};
pub use locale::RequestLocale;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
