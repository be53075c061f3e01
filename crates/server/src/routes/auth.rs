//! Account, session, admin and employee-application handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use sparkure_core::{ApplicationId, ApplicationStatus, Page};

use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{RequireAdmin, RequireAuth, RequireCustomer, clear_session_cookie, session_cookie};
use crate::models::{NewApplication, ProfileUpdate, User};
use crate::services::auth::{ADMIN_SESSION_TTL_SECS, SESSION_TTL_SECS};
use crate::services::invitations::DEFAULT_VALIDITY_DAYS;
use crate::services::{ApplicationService, AuthService, InvitationService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Admin sign-up: an invitation redemption when `token` is present,
/// otherwise a bootstrap of the first administrator.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminSignUpForm {
    pub token: Option<String>,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InviteForm {
    pub email: String,
    pub full_name: String,
    pub valid_for_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<ApplicationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Issue a token for `user`, set the session cookie and echo both.
fn session_response(
    state: &AppState,
    user: &User,
    ttl_secs: i64,
    status: StatusCode,
    message: &str,
) -> Result<Response> {
    let token = state.tokens().issue(user, ttl_secs)?;
    let cookie = session_cookie(&token, ttl_secs, state.config().secure_cookies());

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": message, "user": user, "token": token })),
    )
        .into_response())
}

// =============================================================================
// Customer Accounts
// =============================================================================

/// POST /api/auth/sign-up
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(form): Json<SignUpForm>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .sign_up(&form.full_name, &form.email, &form.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}

/// POST /api/auth/sign-in
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(form): Json<SignInForm>,
) -> Result<Response> {
    let user = AuthService::new(state.pool())
        .sign_in(&form.email, &form.password)
        .await?;

    tracing::info!(user_id = %user.id, "User signed in");
    session_response(&state, &user, SESSION_TTL_SECS, StatusCode::OK, "Sign in successful")
}

/// POST /api/auth/sign-out
pub async fn sign_out(State(state): State<AppState>) -> impl IntoResponse {
    clear_sentry_user();
    (
        [(header::SET_COOKIE, clear_session_cookie(state.config().secure_cookies()))],
        Json(json!({ "message": "Signed out" })),
    )
}

/// GET /api/auth/me
pub async fn me(RequireAuth(user): RequireAuth) -> Json<serde_json::Value> {
    Json(json!({ "user": user }))
}

/// PATCH /api/auth/me
#[instrument(skip(state, user, update), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<serde_json::Value>> {
    if update.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    let user = AuthService::new(state.pool())
        .update_profile(user.id, &update)
        .await?;
    Ok(Json(json!({ "message": "Profile updated successfully", "user": user })))
}

/// POST /api/auth/passchange
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(form): Json<PasswordChangeForm>,
) -> Result<Json<serde_json::Value>> {
    AuthService::new(state.pool())
        .change_password(user.id, &form.current_password, &form.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

// =============================================================================
// Administrators
// =============================================================================

/// POST /api/auth/admin/sign-in
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn admin_sign_in(
    State(state): State<AppState>,
    Json(form): Json<SignInForm>,
) -> Result<Response> {
    let user = AuthService::new(state.pool())
        .admin_sign_in(&form.email, &form.password)
        .await?;

    tracing::info!(user_id = %user.id, "Admin signed in");
    session_response(
        &state,
        &user,
        ADMIN_SESSION_TTL_SECS,
        StatusCode::OK,
        "Sign in successful",
    )
}

/// POST /api/auth/admin/sign-up
#[instrument(skip(state, form))]
pub async fn admin_sign_up(
    State(state): State<AppState>,
    Json(form): Json<AdminSignUpForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.pool());
    let user = match form.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => {
            auth.redeem_invitation(token, &form.password, &form.confirm_password)
                .await?
        }
        None => {
            auth.bootstrap_admin(&form.full_name, &form.email, &form.password)
                .await?
        }
    };

    tracing::info!(user_id = %user.id, "Admin account created");
    session_response(
        &state,
        &user,
        SESSION_TTL_SECS,
        StatusCode::CREATED,
        "Sign up successful",
    )
}

/// POST /api/auth/admin/invite
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id, email = %form.email))]
pub async fn invite_admin(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<InviteForm>,
) -> Result<impl IntoResponse> {
    let issued = InvitationService::new(state.pool(), &state.config().base_url)
        .invite(
            &form.email,
            &form.full_name,
            Some(admin.id),
            form.valid_for_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
        )
        .await?;

    let invitation = &issued.invitation;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Admin invitation created successfully",
            "invitation": {
                "id": invitation.id,
                "email": invitation.email,
                "fullName": invitation.full_name,
                "expiresAt": invitation.expires_at,
                "invitationUrl": issued.url,
            },
        })),
    ))
}

/// GET /api/auth/admin/invite
pub async fn list_invitations(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<serde_json::Value>> {
    let invitations = InvitationService::new(state.pool(), &state.config().base_url)
        .pending()
        .await?;
    Ok(Json(json!({ "invitations": invitations })))
}

// =============================================================================
// Employee Applications
// =============================================================================

/// POST /api/auth/employee/apply
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn apply(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<NewApplication>,
) -> Result<impl IntoResponse> {
    let application = ApplicationService::new(state.pool())
        .apply(&user, form)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Employee application submitted successfully",
            "application": application,
        })),
    ))
}

/// GET /api/auth/employee/apply
pub async fn my_application(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>> {
    let application = ApplicationService::new(state.pool()).latest(user.id).await?;
    Ok(Json(json!({ "application": application })))
}

/// POST /api/auth/employee/review
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id, application_id = %form.application_id))]
pub async fn review_application(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<ReviewForm>,
) -> Result<Json<serde_json::Value>> {
    let application = ApplicationService::new(state.pool())
        .review(admin.id, form.application_id, form.status, form.notes)
        .await?;

    Ok(Json(json!({
        "message": format!(
            "Application {} successfully",
            form.status.to_string().to_lowercase()
        ),
        "application": application,
    })))
}

/// GET /api/auth/employee/review
pub async fn list_applications(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<serde_json::Value>> {
    let page = Page::new(query.limit, query.offset);
    let (applications, info) = ApplicationService::new(state.pool())
        .list(query.status, page)
        .await?;

    Ok(Json(json!({
        "applications": applications,
        "totalCount": info.total_count,
        "hasMore": info.has_more,
    })))
}

