//! Territory manager server library.
//!
//! JSON API for the territory manager: password accounts with cookie
//! sessions, email confirmation and password reset, territory outlines with
//! generated map images, and per-user image settings. Exposed as a library
//! so the router can be tested and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Method, Request, Response, header},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the complete application router.
///
/// Layers, innermost first: request id, CORS, tracing, then the Sentry
/// layers so every request runs in its own hub.
pub fn app(state: AppState) -> Router {
    let config = state.config();

    let credentials = if config.rate_limit_enabled {
        routes::credential_routes().layer(middleware::auth_rate_limiter())
    } else {
        routes::credential_routes()
    };
    let auth = credentials.merge(routes::session_routes());

    let mut router = routes::routes(config.max_image_bytes)
        .nest("/api/auth", auth)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware));

    if let Some(cors) = cors_layer(config.frontend_origin.as_deref()) {
        router = router.layer(cors);
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the single-page frontend, which sends the session cookie.
fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    let Ok(origin) = HeaderValue::from_str(origin) else {
        tracing::warn!(origin, "Ignoring invalid FRONTEND_ORIGIN");
        return None;
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT_LANGUAGE]),
    )
}
