//! Chat repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use sparkure_core::{ChatMessageId, ChatMessageType, ChatRoomId, ChatRoomType, UserId};

use super::RepositoryError;
use crate::models::{ChatMember, ChatMessage, ChatParticipant, ChatRoom, ChatRoomOverview};

const MESSAGE_SELECT: &str = "SELECT m.id, m.chat_room_id, m.content, m.message_type, m.is_read, \
                              m.created_at, m.sender_id, u.full_name AS sender_full_name, \
                              u.avatar AS sender_avatar \
                              FROM chat_messages m JOIN users u ON u.id = m.sender_id";

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: ChatRoomId,
    #[sqlx(rename = "type")]
    kind: ChatRoomType,
    name: Option<String>,
    last_message: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<RoomRow> for ChatRoom {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            name: row.name,
            last_message: row.last_message,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    chat_room_id: ChatRoomId,
    user_id: UserId,
    full_name: String,
    avatar: Option<String>,
    joined_at: DateTime<Utc>,
    last_read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: ChatMessageId,
    chat_room_id: ChatRoomId,
    content: String,
    message_type: ChatMessageType,
    is_read: bool,
    created_at: DateTime<Utc>,
    sender_id: UserId,
    sender_full_name: String,
    sender_avatar: Option<String>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            chat_room_id: row.chat_room_id,
            content: row.content,
            message_type: row.message_type,
            is_read: row.is_read,
            created_at: row.created_at,
            sender: ChatParticipant {
                id: row.sender_id,
                full_name: row.sender_full_name,
                avatar: row.sender_avatar,
            },
        }
    }
}

/// Repository for chat database operations.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Rooms the user belongs to with their members and latest message,
    /// most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_rooms(&self, user_id: UserId) -> Result<Vec<ChatRoomOverview>, RepositoryError> {
        let rooms = sqlx::query_as::<_, RoomRow>(
            r"
            SELECT r.id, r.type, r.name, r.last_message, r.last_message_at, r.created_at
            FROM chat_rooms r
            JOIN chat_room_members me ON me.chat_room_id = r.id AND me.user_id = $1
            ORDER BY r.last_message_at DESC NULLS LAST, r.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        if rooms.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<ChatRoomId> = rooms.iter().map(|r| r.id).collect();

        let members = sqlx::query_as::<_, MemberRow>(
            r"
            SELECT m.chat_room_id, m.user_id, u.full_name, u.avatar, m.joined_at, m.last_read_at
            FROM chat_room_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.chat_room_id = ANY($1)
            ORDER BY m.joined_at
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let latest = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT DISTINCT ON (m.chat_room_id) * FROM ({MESSAGE_SELECT} \
             WHERE m.chat_room_id = ANY($1)) m \
             ORDER BY m.chat_room_id, m.created_at DESC, m.id DESC"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut members_by_room: HashMap<ChatRoomId, Vec<ChatMember>> = HashMap::new();
        for m in members {
            members_by_room
                .entry(m.chat_room_id)
                .or_default()
                .push(ChatMember {
                    user: ChatParticipant {
                        id: m.user_id,
                        full_name: m.full_name,
                        avatar: m.avatar,
                    },
                    joined_at: m.joined_at,
                    last_read_at: m.last_read_at,
                });
        }
        let mut latest_by_room: HashMap<ChatRoomId, ChatMessage> = latest
            .into_iter()
            .map(|m| (m.chat_room_id, m.into()))
            .collect();

        Ok(rooms
            .into_iter()
            .map(|room| ChatRoomOverview {
                members: members_by_room.remove(&room.id).unwrap_or_default(),
                latest_message: latest_by_room.remove(&room.id),
                room: room.into(),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_member(&self, room: ChatRoomId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::is_member_on(&mut conn, room, user_id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_member_on(
        conn: &mut PgConnection,
        room: ChatRoomId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM chat_room_members WHERE chat_room_id = $1 AND user_id = $2)",
        )
        .bind(room)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    /// Messages in a room, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn messages(&self, room: ChatRoomId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "{MESSAGE_SELECT} WHERE m.chat_room_id = $1 ORDER BY m.created_at, m.id"
        ))
        .bind(room)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a message and record it as the room's latest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn insert_message_on(
        conn: &mut PgConnection,
        room: ChatRoomId,
        sender: UserId,
        content: &str,
        message_type: ChatMessageType,
    ) -> Result<ChatMessage, RepositoryError> {
        let (id,): (ChatMessageId,) = sqlx::query_as(
            r"
            INSERT INTO chat_messages (chat_room_id, sender_id, content, message_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(room)
        .bind(sender)
        .bind(content)
        .bind(message_type)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query("UPDATE chat_rooms SET last_message = $2, last_message_at = NOW() WHERE id = $1")
            .bind(room)
            .bind(content)
            .execute(&mut *conn)
            .await?;

        let row = sqlx::query_as::<_, MessageRow>(&format!("{MESSAGE_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.into())
    }

    /// Everyone in the room except `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn other_members_on(
        conn: &mut PgConnection,
        room: ChatRoomId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let rows: Vec<(UserId,)> = sqlx::query_as(
            "SELECT user_id FROM chat_room_members WHERE chat_room_id = $1 AND user_id <> $2",
        )
        .bind(room)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The direct room shared by exactly these two users, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_direct_room_on(
        conn: &mut PgConnection,
        a: UserId,
        b: UserId,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r"
            SELECT r.id, r.type, r.name, r.last_message, r.last_message_at, r.created_at
            FROM chat_rooms r
            WHERE r.type = 'DIRECT'
              AND EXISTS (SELECT 1 FROM chat_room_members WHERE chat_room_id = r.id AND user_id = $1)
              AND EXISTS (SELECT 1 FROM chat_room_members WHERE chat_room_id = r.id AND user_id = $2)
            ORDER BY r.id
            LIMIT 1
            ",
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Serialize direct-room creation for one pair of users until the
    /// transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the lock cannot be taken.
    pub async fn lock_pair_on(
        conn: &mut PgConnection,
        a: UserId,
        b: UserId,
    ) -> Result<(), RepositoryError> {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(low)
            .bind(high)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn create_direct_room_on(
        conn: &mut PgConnection,
        a: UserId,
        b: UserId,
    ) -> Result<ChatRoom, RepositoryError> {
        let room = sqlx::query_as::<_, RoomRow>(
            r"
            INSERT INTO chat_rooms (type) VALUES ('DIRECT')
            RETURNING id, type, name, last_message, last_message_at, created_at
            ",
        )
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO chat_room_members (user_id, chat_room_id) VALUES ($1, $3), ($2, $3)",
        )
        .bind(a)
        .bind(b)
        .bind(room.id)
        .execute(&mut *conn)
        .await?;

        Ok(room.into())
    }

    /// Mark other members' messages read and stamp the caller's read time.
    ///
    /// Returns the number of messages newly marked read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn mark_read(&self, room: ChatRoomId, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE chat_messages SET is_read = TRUE \
             WHERE chat_room_id = $1 AND sender_id <> $2 AND NOT is_read",
        )
        .bind(room)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE chat_room_members SET last_read_at = NOW() \
             WHERE chat_room_id = $1 AND user_id = $2",
        )
        .bind(room)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
