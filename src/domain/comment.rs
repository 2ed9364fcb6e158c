use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{require_text, DomainError};

pub const COMMENT_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub author: String,
    pub author_uuid: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub parent_id: Option<i64>,
}

/// A comment as shown under a post, with like totals for the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub author: String,
    pub author_uuid: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub likes: i64,
    pub liked: bool,
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
}

/// A comment listed on its author's profile.
#[derive(Debug, Clone, Serialize)]
pub struct AuthoredComment {
    pub id: i64,
    pub content: String,
    pub post_uuid: Uuid,
    pub post_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn validate_comment(content: &str) -> Result<(), DomainError> {
    require_text(content, "comment content", COMMENT_MAX_CHARS)
}

/// Builds the two-level thread shown under a post from flat rows.
///
/// `rows` must be ordered oldest first. Top-level comments keep that order
/// and each carries its direct replies, also oldest first. Replies to
/// replies are not surfaced.
pub fn assemble_thread(rows: Vec<CommentView>) -> Vec<CommentView> {
    let mut roots: Vec<CommentView> = Vec::new();
    let mut root_index: HashMap<i64, usize> = HashMap::new();
    let mut replies: Vec<CommentView> = Vec::new();

    for mut row in rows {
        match row.parent_id {
            None => {
                row.replies = Some(Vec::new());
                root_index.insert(row.id, roots.len());
                roots.push(row);
            }
            Some(_) => replies.push(row),
        }
    }

    for mut reply in replies {
        let Some(parent_id) = reply.parent_id else {
            continue;
        };
        if let Some(&index) = root_index.get(&parent_id) {
            reply.replies = None;
            if let Some(children) = roots[index].replies.as_mut() {
                children.push(reply);
            }
        }
    }

    roots
}
