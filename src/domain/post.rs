use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{require_text, DomainError};

pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 5000;
pub const DEFAULT_POST_IMAGE: &str = "posts/images/egg.png";

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: Uuid,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing)]
    pub image: String,
    /// Resolved at response time from `image`.
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub author_id: i64,
    pub author_uuid: Uuid,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Post with its reaction totals and the viewer's own reaction.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub user_liked: bool,
    pub user_disliked: bool,
}

/// Title and body as submitted on create/update.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.title, "title", TITLE_MAX_CHARS)?;
        require_text(&self.content, "content", CONTENT_MAX_CHARS)?;
        Ok(())
    }
}

/// One page of a listing, numbered from 1.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub num_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Lenient page resolution: anything unparsable is the first page, anything
/// out of range is the last page. An empty listing still has one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    pub fn resolve(requested: Option<&str>, total: i64, page_size: i64) -> Self {
        let page_size = page_size.max(1);
        let total = total.max(0);
        let num_pages = ((total + page_size - 1) / page_size).max(1);

        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n < 1 || n > num_pages => num_pages,
            Some(Ok(n)) => n,
        };

        Self {
            number,
            num_pages,
            offset: (number - 1) * page_size,
            limit: page_size,
        }
    }

    pub fn into_page<T>(self, items: Vec<T>, total: i64) -> Page<T> {
        Page {
            items,
            page: self.number,
            num_pages: self.num_pages,
            total,
            has_next: self.number < self.num_pages,
            has_previous: self.number > 1,
        }
    }
}
