//! Booking handlers.
//!
//! Access rules live in the policy; these handlers only translate HTTP.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use sparkure_core::{CleaningId, CleaningStatus, Page};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CleaningForm, CleaningPatch};
use crate::services::CleaningService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CleaningListQuery {
    pub status: Option<CleaningStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/cleanings
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<CleaningListQuery>,
) -> Result<Json<Value>> {
    let page = Page::new(query.limit, query.offset);
    let (cleanings, info) = CleaningService::new(state.pool())
        .list(user.actor(), query.status, page)
        .await?;

    Ok(Json(json!({
        "cleanings": cleanings,
        "totalCount": info.total_count,
        "hasMore": info.has_more,
    })))
}

/// POST /api/cleanings
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<CleaningForm>,
) -> Result<impl IntoResponse> {
    let cleaning = CleaningService::new(state.pool())
        .create(user.actor(), form)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "cleaning": cleaning }))))
}

/// GET /api/cleanings/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CleaningId>,
) -> Result<Json<Value>> {
    let cleaning = CleaningService::new(state.pool())
        .get(user.actor(), id)
        .await?;
    Ok(Json(json!({ "cleaning": cleaning })))
}

/// PATCH /api/cleanings/{id}
#[instrument(skip(state, user, patch), fields(user_id = %user.id, cleaning_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CleaningId>,
    Json(patch): Json<CleaningPatch>,
) -> Result<Json<Value>> {
    let cleaning = CleaningService::new(state.pool())
        .update(user.actor(), id, patch)
        .await?;
    Ok(Json(json!({ "cleaning": cleaning })))
}

/// DELETE /api/cleanings/{id}
#[instrument(skip(state, user), fields(user_id = %user.id, cleaning_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CleaningId>,
) -> Result<Json<Value>> {
    CleaningService::new(state.pool())
        .delete(user.actor(), id)
        .await?;
    Ok(Json(json!({ "message": "Cleaning deleted successfully" })))
}
