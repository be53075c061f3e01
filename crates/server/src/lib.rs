//! Sparkure API server library.
//!
//! The binary in `main.rs` only loads configuration, wires observability and
//! binds a socket; everything servable lives here so tests can drive the
//! router directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    page_guard_middleware, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Build the full application: routes plus the middleware stack.
///
/// Layer order, outermost first: Sentry hub, Sentry HTTP transaction,
/// request span, request ID, security headers, page guard.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(from_fn_with_state(state.clone(), page_guard_middleware))
        .layer(from_fn_with_state(state.clone(), security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
        .layer(sentry_tower::NewSentryLayer::new_from_top())
}
