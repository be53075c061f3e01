//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Responses are JSON
//! `{"error": "<message>"}`; server-side failures are captured to Sentry and
//! the client only sees a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use sparkure_core::PolicyError;

use crate::db::RepositoryError;
use crate::services::{
    ApplicationError, AuthError, ChatError, CleaningError, InvitationError, TokenError,
};

const INTERNAL: &str = "Internal server error";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Cleaning error: {0}")]
    Cleaning(#[from] CleaningError),

    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    #[error("Invitation error: {0}")]
    Invitation(#[from] InvitationError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code and the message safe to show the client.
    fn public(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository(err),
            Self::Auth(err) => auth(err),
            Self::Token(TokenError::Invalid) => (StatusCode::UNAUTHORIZED, "Invalid token".into()),
            Self::Token(TokenError::Expired) => (StatusCode::UNAUTHORIZED, "Token expired".into()),
            Self::Token(TokenError::Encode(_)) | Self::Internal(_) => internal(),
            Self::Cleaning(err) => cleaning(err),
            Self::Application(err) => application(err),
            Self::Invitation(err) => invitation(err),
            Self::Chat(err) => chat(err),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.public();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(status, StatusCode::FORBIDDEN) {
            tracing::warn!(error = %self, "Request forbidden");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.into())
}

fn repository(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".into()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

fn auth(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".into()),
        AuthError::MissingField(field) => (StatusCode::BAD_REQUEST, format!("{field} is required")),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::PasswordMismatch => (StatusCode::BAD_REQUEST, "Passwords do not match".into()),
        AuthError::InvalidInvitation => {
            (StatusCode::BAD_REQUEST, "Invalid or expired invitation".into())
        }
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".into()),
        AuthError::AccountDisabled => (StatusCode::UNAUTHORIZED, "Account is deactivated".into()),
        AuthError::IncorrectPassword => {
            (StatusCode::UNAUTHORIZED, "Current password is incorrect".into())
        }
        AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required".into()),
        AuthError::AdminExists => (
            StatusCode::FORBIDDEN,
            "An administrator already exists. Ask an administrator for an invitation.".into(),
        ),
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".into()),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this email already exists".into(),
        ),
        AuthError::Repository(err) => repository(err),
        AuthError::PasswordHash => internal(),
    }
}

fn cleaning(err: &CleaningError) -> (StatusCode, String) {
    match err {
        CleaningError::NotFound => (StatusCode::NOT_FOUND, "Cleaning not found".into()),
        CleaningError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        CleaningError::Policy(PolicyError::Forbidden(msg)) => {
            (StatusCode::FORBIDDEN, (*msg).to_string())
        }
        CleaningError::Policy(
            err @ (PolicyError::IllegalTransition(_) | PolicyError::NotAssignable(_)),
        ) => (StatusCode::CONFLICT, err.to_string()),
        CleaningError::Repository(err) => repository(err),
    }
}

fn application(err: &ApplicationError) -> (StatusCode, String) {
    match err {
        ApplicationError::AlreadyEmployee => {
            (StatusCode::BAD_REQUEST, "You are already an employee".into())
        }
        ApplicationError::NotCustomer => (
            StatusCode::FORBIDDEN,
            "Only customers can apply to become employees".into(),
        ),
        ApplicationError::MissingField(field) => {
            (StatusCode::BAD_REQUEST, format!("{field} is required"))
        }
        ApplicationError::AlreadyReviewed => (
            StatusCode::BAD_REQUEST,
            "Application has already been reviewed".into(),
        ),
        ApplicationError::InvalidDecision => (
            StatusCode::BAD_REQUEST,
            "Status must be APPROVED or REJECTED".into(),
        ),
        ApplicationError::DuplicatePending => (
            StatusCode::CONFLICT,
            "You already have a pending application".into(),
        ),
        ApplicationError::NotFound => (StatusCode::NOT_FOUND, "Application not found".into()),
        ApplicationError::Repository(err) => repository(err),
    }
}

fn invitation(err: &InvitationError) -> (StatusCode, String) {
    match err {
        InvitationError::InvalidEmail(_) => {
            (StatusCode::BAD_REQUEST, "Invalid email address".into())
        }
        InvitationError::MissingName => (StatusCode::BAD_REQUEST, "fullName is required".into()),
        InvitationError::UserExists => (
            StatusCode::CONFLICT,
            "A user with this email already exists".into(),
        ),
        InvitationError::AlreadyInvited => (
            StatusCode::CONFLICT,
            "An active invitation already exists for this email".into(),
        ),
        InvitationError::Repository(err) => repository(err),
    }
}

fn chat(err: &ChatError) -> (StatusCode, String) {
    match err {
        ChatError::NotMember => (
            StatusCode::FORBIDDEN,
            "You are not a member of this chat room".into(),
        ),
        ChatError::EmptyMessage => (StatusCode::BAD_REQUEST, "Message content is required".into()),
        ChatError::SelfChat => (
            StatusCode::BAD_REQUEST,
            "You cannot start a chat with yourself".into(),
        ),
        ChatError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".into()),
        ChatError::Repository(err) => repository(err),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
