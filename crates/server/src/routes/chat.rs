//! Messaging handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use sparkure_core::{ChatMessageType, ChatRoomId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::ChatService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    pub chat_room_id: Option<ChatRoomId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendForm {
    pub chat_room_id: ChatRoomId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub message_type: ChatMessageType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectForm {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadForm {
    pub chat_room_id: ChatRoomId,
}

/// GET /api/chat
///
/// Lists the caller's rooms, or the messages of one room with `?chatRoomId=`.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ChatQuery>,
) -> Result<Json<Value>> {
    let chat = ChatService::new(state.pool());
    let body = match query.chat_room_id {
        Some(room) => json!({ "messages": chat.messages(user.id, room).await? }),
        None => json!({ "chatRooms": chat.rooms(user.id).await? }),
    };
    Ok(Json(body))
}

/// POST /api/chat
pub async fn send(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<SendForm>,
) -> Result<impl IntoResponse> {
    let message = ChatService::new(state.pool())
        .send(&user, form.chat_room_id, &form.content, form.message_type)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

/// POST /api/chat/direct
pub async fn open_direct(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<DirectForm>,
) -> Result<Json<Value>> {
    let room = ChatService::new(state.pool())
        .open_direct(user.id, form.user_id)
        .await?;
    Ok(Json(json!({ "chatRoom": room })))
}

/// PATCH /api/chat/read
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<ReadForm>,
) -> Result<Json<Value>> {
    let updated = ChatService::new(state.pool())
        .mark_read(user.id, form.chat_room_id)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}
