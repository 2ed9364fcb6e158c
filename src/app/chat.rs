use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::app::users::{summary_from_row, UserService};
use crate::domain::message::{annotate_for_viewer, prepare_message, ChatMessage, Message};
use crate::domain::user::{User, UserSummary};
use crate::domain::DomainError;
use crate::infra::db::Db;

/// Direct messages between two users. Clients poll `messages` for the
/// whole history; there is no push channel and no cursor.
#[derive(Clone)]
pub struct ChatService {
    db: Db,
    users: UserService,
}

impl ChatService {
    pub fn new(db: Db) -> Self {
        Self {
            users: UserService::new(db.clone()),
            db,
        }
    }

    pub async fn send(&self, sender_id: i64, recipient_uuid: Uuid, raw_content: &str) -> Result<Message> {
        let recipient = self.users.require_by_uuid(recipient_uuid).await?;
        let content = prepare_message(raw_content)?;

        let row = sqlx::query(
            "WITH m AS ( \
                INSERT INTO messages (sender_id, recipient_id, content) \
                VALUES ($1, $2, $3) \
                RETURNING id, sender_id, content, created_at, is_read \
             ) \
             SELECT m.id, m.sender_id, m.content, m.created_at, m.is_read, \
                    u.username AS sender, u.user_uuid AS sender_uuid \
             FROM m JOIN users u ON u.id = m.sender_id",
        )
        .bind(sender_id)
        .bind(recipient.id)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(message_from_row(&row))
    }

    /// Opens the conversation with `target_uuid`, marking everything the
    /// target sent to the viewer as read. Returns the target and how many
    /// messages were marked.
    pub async fn open(&self, viewer_id: i64, target_uuid: Uuid) -> Result<(User, u64)> {
        let target = self.users.require_by_uuid(target_uuid).await?;
        if target.id == viewer_id {
            return Err(DomainError::invalid("cannot chat with yourself").into());
        }

        let marked = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE sender_id = $1 AND recipient_id = $2 AND NOT is_read",
        )
        .bind(target.id)
        .bind(viewer_id)
        .execute(self.db.pool())
        .await?;

        Ok((target, marked.rows_affected()))
    }

    /// Full history between the viewer and `target_uuid`, oldest first.
    pub async fn messages(&self, viewer_id: i64, target_uuid: Uuid) -> Result<Vec<ChatMessage>> {
        let target = self.users.require_by_uuid(target_uuid).await?;

        let rows = sqlx::query(
            "SELECT m.id, m.sender_id, m.content, m.created_at, m.is_read, \
                    u.username AS sender, u.user_uuid AS sender_uuid \
             FROM messages m \
             JOIN users u ON u.id = m.sender_id \
             WHERE (m.sender_id = $1 AND m.recipient_id = $2) \
                OR (m.sender_id = $2 AND m.recipient_id = $1) \
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(viewer_id)
        .bind(target.id)
        .fetch_all(self.db.pool())
        .await?;

        let history = rows.iter().map(message_from_row).collect();
        Ok(annotate_for_viewer(viewer_id, history))
    }

    /// Everyone the viewer has exchanged a message with, by username.
    pub async fn conversations(&self, viewer_id: i64) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.username, u.user_uuid, u.profile_image \
             FROM users u \
             WHERE u.id IN ( \
                SELECT recipient_id FROM messages WHERE sender_id = $1 \
                UNION \
                SELECT sender_id FROM messages WHERE recipient_id = $1 \
             ) \
             ORDER BY u.username ASC",
        )
        .bind(viewer_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(summary_from_row).collect())
    }
}

fn message_from_row(row: &sqlx::postgres::PgRow) -> Message {
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        sender: row.get("sender"),
        sender_uuid: row.get("sender_uuid"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        is_read: row.get("is_read"),
    }
}
