//! Notification inbox handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use sparkure_core::{NotificationId, Page};

use crate::db::{NotificationRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkReadForm {
    pub notification_ids: Option<Vec<NotificationId>>,
    pub mark_all_as_read: bool,
}

/// GET /api/notifications
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>> {
    let page = Page::new(query.limit, query.offset);
    let (notifications, total) = NotificationRepository::new(state.pool())
        .list(user.id, query.unread, page)
        .await?;
    let info = page.info(total);

    Ok(Json(json!({
        "notifications": notifications,
        "totalCount": info.total_count,
        "hasMore": info.has_more,
    })))
}

/// PATCH /api/notifications
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<MarkReadForm>,
) -> Result<Json<Value>> {
    let repo = NotificationRepository::new(state.pool());
    let updated = match form {
        MarkReadForm {
            mark_all_as_read: true,
            ..
        } => repo.mark_all_read(user.id).await?,
        MarkReadForm {
            notification_ids: Some(ids),
            ..
        } => repo.mark_read(user.id, &ids).await?,
        MarkReadForm { .. } => {
            return Err(AppError::BadRequest(
                "Provide notificationIds or markAllAsRead".to_string(),
            ));
        }
    };

    Ok(Json(json!({
        "message": "Notifications marked as read",
        "updated": updated,
    })))
}

/// DELETE /api/notifications/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<Json<Value>> {
    NotificationRepository::new(state.pool())
        .delete(user.id, id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Notification not found".to_string()),
            other => other.into(),
        })?;
    Ok(Json(json!({ "message": "Notification deleted" })))
}
