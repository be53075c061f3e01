//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (database reachable)
//!
//! # Auth (sign-in/sign-up routes are rate limited)
//! POST  /api/auth/sign-up           - Create a customer account
//! POST  /api/auth/sign-in           - Open a 7-day session
//! POST  /api/auth/sign-out          - Clear the session cookie
//! GET   /api/auth/me                - Caller profile
//! PATCH /api/auth/me                - Update own profile (USER)
//! POST  /api/auth/passchange        - Change password (USER)
//! POST  /api/auth/admin/sign-in     - Open a 1-day admin session
//! POST  /api/auth/admin/sign-up     - Redeem an invitation or bootstrap the first admin
//! GET   /api/auth/admin/invite      - Pending invitations (ADMIN)
//! POST  /api/auth/admin/invite      - Invite an admin (ADMIN)
//! GET   /api/auth/employee/apply    - Own latest application
//! POST  /api/auth/employee/apply    - Apply to become an employee
//! GET   /api/auth/employee/review   - Application queue (ADMIN)
//! POST  /api/auth/employee/review   - Approve or reject (ADMIN)
//!
//! # Bookings
//! GET    /api/cleanings             - List (scoped to the caller)
//! POST   /api/cleanings             - Book (USER)
//! GET    /api/cleanings/{id}        - Detail
//! PATCH  /api/cleanings/{id}        - Sparse update and status transitions
//! DELETE /api/cleanings/{id}        - Remove own SCHEDULED booking (USER)
//! GET    /api/history               - Completed bookings and spend (USER)
//!
//! # Messaging and inbox
//! GET   /api/chat                   - Rooms, or messages with ?chatRoomId=
//! POST  /api/chat                   - Send a message
//! POST  /api/chat/direct            - Open (or reuse) a direct room
//! PATCH /api/chat/read              - Mark a room read
//! GET   /api/notifications          - Inbox (?unread=true)
//! PATCH /api/notifications          - Mark read
//! DELETE /api/notifications/{id}    - Delete one
//! POST  /api/contact                - Contact form
//! ```

pub mod auth;
pub mod chat;
pub mod cleanings;
pub mod contact;
pub mod history;
pub mod notifications;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;

use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the `/api/auth` router.
pub fn auth_routes() -> Router<AppState> {
    let credential_routes = Router::new()
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-in", post(auth::sign_in))
        .route("/admin/sign-in", post(auth::admin_sign_in))
        .route("/admin/sign-up", post(auth::admin_sign_up))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/sign-out", post(auth::sign_out))
        .route("/me", get(auth::me).patch(auth::update_me))
        .route("/passchange", post(auth::change_password))
        .route(
            "/admin/invite",
            get(auth::list_invitations).post(auth::invite_admin),
        )
        .route(
            "/employee/apply",
            get(auth::my_application).post(auth::apply),
        )
        .route(
            "/employee/review",
            get(auth::list_applications).post(auth::review_application),
        )
        .merge(credential_routes)
}

/// Create all `/api` routes except auth.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/cleanings", get(cleanings::index).post(cleanings::create))
        .route(
            "/cleanings/{id}",
            get(cleanings::show)
                .patch(cleanings::update)
                .delete(cleanings::destroy),
        )
        .route("/history", get(history::index))
        .route("/chat", get(chat::index).post(chat::send))
        .route("/chat/direct", post(chat::open_direct))
        .route("/chat/read", patch(chat::mark_read))
        .route(
            "/notifications",
            get(notifications::index).patch(notifications::mark_read),
        )
        .route(
            "/notifications/{id}",
            axum::routing::delete(notifications::destroy),
        )
        .route("/contact", post(contact::submit))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api", api_routes())
        .fallback(not_found)
}

/// Liveness health check. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check; 503 when the database is unreachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use sparkure_core::{Email, Role, UserId};

    use crate::config::test_config;
    use crate::middleware::AUTH_COOKIE;
    use crate::models::User;

    use super::*;

    /// An app whose pool never connects; only paths that stop before the
    /// database are exercised.
    fn test_state() -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://sparkure@localhost:1/unreachable")
            .unwrap();
        AppState::new(test_config(), pool)
    }

    fn test_app() -> Router {
        crate::app(test_state())
    }

    fn alice() -> User {
        User {
            id: UserId::new(1),
            full_name: "Alice".to_string(),
            email: Email::parse("alice@example.com").unwrap(),
            role: Role::User,
            phone: None,
            address: None,
            avatar: None,
            is_active: true,
            is_email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get_with_cookie(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, format!("{AUTH_COOKIE}={token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        for uri in ["/api/auth/me", "/api/cleanings", "/api/history", "/api/notifications"] {
            let (status, body) = send(
                test_app(),
                Request::builder().uri(uri).body(Body::empty()).unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "No authentication token", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let (status, body) = send(test_app(), get_with_cookie("/api/cleanings", "not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn test_expired_token_is_reported() {
        let state = test_state();
        let token = state.tokens().issue(&alice(), -3600).unwrap();
        let (status, body) = send(crate::app(state), get_with_cookie("/api/auth/me", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Token expired");
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/sign-out")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("auth-token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store, max-age=0");
    }

    #[tokio::test]
    async fn test_unknown_api_route_is_json_404() {
        let (status, body) = send(
            test_app(),
            Request::builder().uri("/api/nope").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn test_page_guard_redirects_anonymous_visitors() {
        let response = test_app()
            .oneshot(Request::builder().uri("/booking").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/sign-in?returnTo=%2Fbooking&reason=booking"
        );
    }

    #[tokio::test]
    async fn test_page_guard_sends_customer_away_from_admin() {
        let state = test_state();
        let token = state.tokens().issue(&alice(), 3600).unwrap();
        let response = crate::app(state)
            .oneshot(get_with_cookie("/admin", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/dashboard");
    }
}
