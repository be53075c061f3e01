//! Contact form handler.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::instrument;

use crate::db::ContactRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::NewContactSubmission;
use crate::state::AppState;

/// POST /api/contact
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<NewContactSubmission>,
) -> Result<impl IntoResponse> {
    let form = form.validated().map_err(AppError::BadRequest)?;
    let submission = ContactRepository::new(state.pool())
        .create(user.id, &form)
        .await?;

    tracing::info!(submission_id = %submission.id, "Contact form submitted");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Contact form submitted successfully",
            "data": submission,
        })),
    ))
}
