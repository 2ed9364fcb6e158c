use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::app::posts::PostService;
use crate::domain::comment::{assemble_thread, validate_comment, AuthoredComment, Comment, CommentView};
use crate::domain::DomainError;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct CommentService {
    db: Db,
    posts: PostService,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self {
            posts: PostService::new(db.clone()),
            db,
        }
    }

    /// Adds a comment, or a reply when `parent_id` names a comment on the
    /// same post.
    pub async fn add(
        &self,
        post_uuid: Uuid,
        author_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Comment> {
        let post = self.posts.require_post(post_uuid).await?;
        validate_comment(content)?;

        if let Some(parent_id) = parent_id {
            let parent_post: Option<i64> =
                sqlx::query_scalar("SELECT post_id FROM comments WHERE id = $1")
                    .bind(parent_id)
                    .fetch_optional(self.db.pool())
                    .await?;
            if parent_post != Some(post.id) {
                return Err(DomainError::invalid("parent comment does not belong to this post").into());
            }
        }

        let row = sqlx::query(
            "WITH c AS ( \
                INSERT INTO comments (content, author_id, post_id, parent_id) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, content, author_id, parent_id, created_at \
             ) \
             SELECT c.id, c.content, c.parent_id, c.created_at, \
                    u.username AS author, u.user_uuid AS author_uuid \
             FROM c JOIN users u ON u.id = c.author_id",
        )
        .bind(content)
        .bind(author_id)
        .bind(post.id)
        .bind(parent_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Comment {
            id: row.get("id"),
            author: row.get("author"),
            author_uuid: row.get("author_uuid"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            parent_id: row.get("parent_id"),
        })
    }

    /// Top-level comments oldest first, each with its direct replies.
    /// `liked` is always false for anonymous viewers.
    pub async fn thread(&self, post_uuid: Uuid, viewer_id: Option<i64>) -> Result<Vec<CommentView>> {
        let post = self.posts.require_post(post_uuid).await?;

        let rows = sqlx::query(
            "SELECT c.id, c.content, c.parent_id, c.created_at, \
                    u.username AS author, u.user_uuid AS author_uuid, \
                    (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS likes, \
                    EXISTS ( \
                        SELECT 1 FROM comment_likes cl \
                        WHERE cl.comment_id = c.id AND cl.user_id = $2 \
                    ) AS liked \
             FROM comments c \
             JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post.id)
        .bind(viewer_id)
        .fetch_all(self.db.pool())
        .await?;

        let flat = rows
            .into_iter()
            .map(|row| CommentView {
                id: row.get("id"),
                author: row.get("author"),
                author_uuid: row.get("author_uuid"),
                content: row.get("content"),
                created_at: row.get("created_at"),
                likes: row.get("likes"),
                liked: row.get("liked"),
                parent_id: row.get("parent_id"),
                replies: None,
            })
            .collect();

        Ok(assemble_thread(flat))
    }

    /// Newest first, for the author's profile page.
    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<AuthoredComment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.content, c.created_at, p.post_uuid, p.title AS post_title \
             FROM comments c \
             JOIN posts p ON p.id = c.post_id \
             WHERE c.author_id = $1 \
             ORDER BY c.created_at DESC, c.id DESC",
        )
        .bind(author_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AuthoredComment {
                id: row.get("id"),
                content: row.get("content"),
                post_uuid: row.get("post_uuid"),
                post_title: row.get("post_title"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
