//! Messaging between users.

use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;

use sparkure_core::{ChatMessageType, ChatRoomId, NotificationType, UserId};

use crate::db::{ChatRepository, NotificationRepository, RepositoryError, UserRepository};
use crate::models::{ChatMessage, ChatRoom, ChatRoomOverview, NewNotification, User};

/// Longest message preview placed in a notification.
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("not a member of this chat room")]
    NotMember,

    #[error("message content is required")]
    EmptyMessage,

    #[error("cannot open a chat with yourself")]
    SelfChat,

    #[error("user not found")]
    UserNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

pub struct ChatService<'a> {
    pool: &'a PgPool,
    chat: ChatRepository<'a>,
}

impl<'a> ChatService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            chat: ChatRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `ChatError::Repository` if a query fails.
    pub async fn rooms(&self, user_id: UserId) -> Result<Vec<ChatRoomOverview>, ChatError> {
        Ok(self.chat.list_rooms(user_id).await?)
    }

    /// Messages of a room, oldest first. Empty for non-members.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if a query fails.
    pub async fn messages(
        &self,
        user_id: UserId,
        room: ChatRoomId,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        if !self.chat.is_member(room, user_id).await? {
            return Ok(Vec::new());
        }
        Ok(self.chat.messages(room).await?)
    }

    /// Post a message and notify the other members.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::NotMember` if the sender is not in the room and
    /// `ChatError::EmptyMessage` for blank content.
    pub async fn send(
        &self,
        sender: &User,
        room: ChatRoomId,
        content: &str,
        message_type: ChatMessageType,
    ) -> Result<ChatMessage, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut tx = self.pool.begin().await?;

        if !ChatRepository::is_member_on(&mut tx, room, sender.id).await? {
            return Err(ChatError::NotMember);
        }
        let message =
            ChatRepository::insert_message_on(&mut tx, room, sender.id, content, message_type)
                .await?;

        let notice_body = preview(content);
        for recipient in ChatRepository::other_members_on(&mut tx, room, sender.id).await? {
            NotificationRepository::insert_on(
                &mut tx,
                &NewNotification::new(
                    recipient,
                    NotificationType::MessageReceived,
                    format!("New message from {}", sender.full_name),
                    notice_body.clone(),
                )
                .with_data(json!({ "chatRoomId": room, "messageId": message.id })),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(message)
    }

    /// The direct room shared with `other`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::SelfChat` when `other` is the caller and
    /// `ChatError::UserNotFound` for an unknown or inactive user.
    pub async fn open_direct(&self, me: UserId, other: UserId) -> Result<ChatRoom, ChatError> {
        if me == other {
            return Err(ChatError::SelfChat);
        }

        let mut tx = self.pool.begin().await?;

        let reachable = UserRepository::get_by_id_on(&mut tx, other)
            .await?
            .is_some_and(|u| u.is_active);
        if !reachable {
            return Err(ChatError::UserNotFound);
        }

        ChatRepository::lock_pair_on(&mut tx, me, other).await?;
        let room = match ChatRepository::find_direct_room_on(&mut tx, me, other).await? {
            Some(room) => room,
            None => ChatRepository::create_direct_room_on(&mut tx, me, other).await?,
        };

        tx.commit().await?;
        Ok(room)
    }

    /// # Errors
    ///
    /// Returns `ChatError::NotMember` if the caller is not in the room.
    pub async fn mark_read(&self, user_id: UserId, room: ChatRoomId) -> Result<u64, ChatError> {
        if !self.chat.is_member(room, user_id).await? {
            return Err(ChatError::NotMember);
        }
        Ok(self.chat.mark_read(room, user_id).await?)
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_owned();
    }
    let cut: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("hello"), "hello");

        let long = "é".repeat(PREVIEW_CHARS + 5);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 1);
        assert!(p.ends_with('…'));
    }
}
