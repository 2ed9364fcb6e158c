use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::user::PublicUser;
use super::DomainError;

pub const MESSAGE_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    #[serde(skip_serializing)]
    pub sender_id: i64,
    pub sender: String,
    pub sender_uuid: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

/// A message as rendered for one side of the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender: String,
    pub sender_uuid: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_from_me: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOpened {
    pub target: PublicUser,
    pub marked_read: u64,
}

/// Trims the submitted text and checks it fits in a message.
pub fn prepare_message(raw: &str) -> Result<String, DomainError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(DomainError::invalid("message cannot be empty"));
    }
    if content.chars().count() > MESSAGE_MAX_CHARS {
        return Err(DomainError::invalid(format!(
            "message must be at most {} characters",
            MESSAGE_MAX_CHARS
        )));
    }
    Ok(content.to_string())
}

/// Tags each message with whether `viewer_id` sent it. Order is preserved.
pub fn annotate_for_viewer(viewer_id: i64, messages: Vec<Message>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .map(|message| ChatMessage {
            is_from_me: message.sender_id == viewer_id,
            id: message.id,
            sender: message.sender,
            sender_uuid: message.sender_uuid,
            content: message.content,
            created_at: message.created_at,
        })
        .collect()
}
