//! Authentication extractors.
//!
//! The session token names the user; the user row decides the rest. Every
//! authenticated request re-reads the account so a deactivated user is shut
//! out immediately and a promoted user gets their new role without signing
//! in again.
//!
//! ```rust,ignore
//! async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
//!     Json(user)
//! }
//! ```

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use sparkure_core::{Action, Resource, Role, authorize};

use super::cookie::token_from_headers;
use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::TokenError;
use crate::state::AppState;

/// Extractor that requires an authenticated, active user.
pub struct RequireAuth(pub User);

/// Extractor that requires the `ADMIN` role.
pub struct RequireAdmin(pub User);

/// Extractor that requires the `USER` (customer) role, or an admin.
pub struct RequireCustomer(pub User);

/// Error returned when authentication or a role check fails.
#[derive(Debug)]
pub enum AuthRejection {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    /// The token was valid but the account is gone or deactivated.
    Unauthorized,
    Forbidden,
    Database(RepositoryError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "No authentication token"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            Self::ExpiredToken => (StatusCode::UNAUTHORIZED, "Token expired"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            Self::Database(err) => return AppError::from(err).into_response(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AuthRejection::MissingToken)?;

        let claims = state.tokens().verify(&token).map_err(|err| {
            warn!(path = %parts.uri.path(), error = %err, "Rejected session token");
            match err {
                TokenError::Expired => AuthRejection::ExpiredToken,
                TokenError::Invalid | TokenError::Encode(_) => AuthRejection::InvalidToken,
            }
        })?;

        let user = UserRepository::new(state.pool())
            .get_by_id(claims.user_id)
            .await
            .map_err(AuthRejection::Database)?
            .filter(|user| user.is_active)
            .ok_or_else(|| {
                warn!(user_id = %claims.user_id, "Token for missing or inactive account");
                AuthRejection::Unauthorized
            })?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", user.id.as_i32());

        Ok(Self(user))
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: Role,
) -> Result<User, AuthRejection> {
    let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

    if let Err(err) = authorize(&user.actor(), &Resource::RoleGated(role), Action::Read) {
        warn!(
            user_id = %user.id,
            role = %user.role,
            required = %role,
            path = %parts.uri.path(),
            error = %err,
            "Role check failed"
        );
        return Err(AuthRejection::Forbidden);
    }

    Ok(user)
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::User).await.map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn error_of(rejection: AuthRejection) -> (StatusCode, String) {
        let response = rejection.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json["error"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_rejection_messages() {
        assert_eq!(
            error_of(AuthRejection::MissingToken).await,
            (StatusCode::UNAUTHORIZED, "No authentication token".to_string())
        );
        assert_eq!(
            error_of(AuthRejection::ExpiredToken).await,
            (StatusCode::UNAUTHORIZED, "Token expired".to_string())
        );
        assert_eq!(
            error_of(AuthRejection::Forbidden).await,
            (StatusCode::FORBIDDEN, "Insufficient permissions".to_string())
        );
    }

    #[tokio::test]
    async fn test_database_rejection_is_internal() {
        let (status, message) =
            error_of(AuthRejection::Database(RepositoryError::DataCorruption("x".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }
}
