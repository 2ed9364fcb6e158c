use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::post::{Post, PostDetail, PostDraft, DEFAULT_POST_IMAGE};
use crate::domain::DomainError;
use crate::infra::db::Db;

const POST_COLUMNS: &str = "p.id, p.post_uuid, p.title, p.content, p.post_image, p.author_id, \
                            u.user_uuid AS author_uuid, u.username AS author, \
                            p.created_at, p.updated_at";

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(
        &self,
        author_id: i64,
        draft: &PostDraft,
        image_key: Option<&str>,
    ) -> Result<Post> {
        draft.validate()?;

        let row = sqlx::query(&format!(
            "WITH p AS ( \
                INSERT INTO posts (post_uuid, title, content, post_image, author_id) \
                VALUES ($1, $2, $3, $4, $5) \
                RETURNING * \
             ) \
             SELECT {} FROM p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(image_key.unwrap_or(DEFAULT_POST_IMAGE))
        .bind(author_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    pub async fn get_post(&self, post_uuid: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.post_uuid = $1",
            POST_COLUMNS
        ))
        .bind(post_uuid)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| post_from_row(&row)))
    }

    pub async fn require_post(&self, post_uuid: Uuid) -> Result<Post> {
        self.get_post(post_uuid)
            .await?
            .ok_or_else(|| DomainError::NotFound("post").into())
    }

    /// Replaces title and content, and the image when a new one is given.
    /// Only the author may update; `updated_at` moves to now.
    pub async fn update_post(
        &self,
        post_uuid: Uuid,
        actor_id: i64,
        draft: &PostDraft,
        image_key: Option<&str>,
    ) -> Result<Post> {
        let existing = self.require_post(post_uuid).await?;
        if existing.author_id != actor_id {
            return Err(DomainError::forbidden("only the author can update this post").into());
        }
        draft.validate()?;

        let row = sqlx::query(&format!(
            "WITH p AS ( \
                UPDATE posts \
                SET title = $3, content = $4, post_image = COALESCE($5, post_image), updated_at = now() \
                WHERE id = $1 AND author_id = $2 \
                RETURNING * \
             ) \
             SELECT {} FROM p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        ))
        .bind(existing.id)
        .bind(actor_id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(image_key)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| post_from_row(&row))
            .ok_or_else(|| DomainError::NotFound("post").into())
    }

    pub async fn detail(&self, post_uuid: Uuid, viewer_id: Option<i64>) -> Result<Option<PostDetail>> {
        let post = match self.get_post(post_uuid).await? {
            Some(post) => post,
            None => return Ok(None),
        };

        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM post_likes WHERE post_id = $1) AS likes_count, \
                (SELECT COUNT(*) FROM post_dislikes WHERE post_id = $1) AS dislikes_count, \
                EXISTS (SELECT 1 FROM post_likes WHERE post_id = $1 AND user_id = $2) AS user_liked, \
                EXISTS (SELECT 1 FROM post_dislikes WHERE post_id = $1 AND user_id = $2) AS user_disliked",
        )
        .bind(post.id)
        .bind(viewer_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Some(PostDetail {
            likes_count: row.get("likes_count"),
            dislikes_count: row.get("dislikes_count"),
            user_liked: row.get("user_liked"),
            user_disliked: row.get("user_disliked"),
            post,
        }))
    }

    pub async fn count_posts(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        Ok(total)
    }

    /// All posts, most recently updated first.
    pub async fn list_recent(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
             ORDER BY p.updated_at DESC, p.id DESC \
             OFFSET $1 LIMIT $2",
            POST_COLUMNS
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
             WHERE p.author_id = $1 \
             ORDER BY p.updated_at DESC, p.id DESC",
            POST_COLUMNS
        ))
        .bind(author_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        uuid: row.get("post_uuid"),
        title: row.get("title"),
        content: row.get("content"),
        image: row.get("post_image"),
        image_url: None,
        author_id: row.get("author_id"),
        author_uuid: row.get("author_uuid"),
        author: row.get("author"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
