//! Chat models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sparkure_core::{ChatMessageId, ChatMessageType, ChatRoomId, ChatRoomType, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: ChatRoomId,
    #[serde(rename = "type")]
    pub kind: ChatRoomType,
    pub name: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public profile of someone taking part in a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParticipant {
    pub id: UserId,
    pub full_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMember {
    pub user: ChatParticipant,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub chat_room_id: ChatRoomId,
    pub content: String,
    pub message_type: ChatMessageType,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub sender: ChatParticipant,
}

/// A room as listed in the caller's inbox.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomOverview {
    #[serde(flatten)]
    pub room: ChatRoom,
    pub members: Vec<ChatMember>,
    pub latest_message: Option<ChatMessage>,
}
