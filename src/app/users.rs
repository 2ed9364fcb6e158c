use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::{FollowCounts, User, UserSummary};
use crate::domain::DomainError;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, user_uuid, username, email, profile_image, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    pub async fn get_by_uuid(&self, user_uuid: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, user_uuid, username, email, profile_image, created_at \
             FROM users WHERE user_uuid = $1",
        )
        .bind(user_uuid)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    /// Like `get_by_uuid`, but a missing user is a `DomainError::NotFound`.
    pub async fn require_by_uuid(&self, user_uuid: Uuid) -> Result<User> {
        self.get_by_uuid(user_uuid)
            .await?
            .ok_or_else(|| DomainError::NotFound("user").into())
    }

    pub async fn update_profile_image(&self, user_id: i64, image_key: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "UPDATE users SET profile_image = $2 \
             WHERE id = $1 \
             RETURNING id, user_uuid, username, email, profile_image, created_at",
        )
        .bind(user_id)
        .bind(image_key)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    /// Most recent followers first.
    pub async fn list_followers(&self, user_id: i64, limit: i64) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.username, u.user_uuid, u.profile_image \
             FROM follows f \
             JOIN users u ON u.id = f.follower_id \
             WHERE f.following_id = $1 \
             ORDER BY f.created_at DESC, f.follower_id DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    /// Most recently followed first.
    pub async fn list_following(&self, user_id: i64, limit: i64) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.username, u.user_uuid, u.profile_image \
             FROM follows f \
             JOIN users u ON u.id = f.following_id \
             WHERE f.follower_id = $1 \
             ORDER BY f.created_at DESC, f.following_id DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    pub async fn follow_counts(&self, user_id: i64) -> Result<FollowCounts> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM follows WHERE following_id = $1) AS followers_count, \
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following_count",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(FollowCounts {
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
        })
    }

    pub async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(exists)
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        user_uuid: row.get("user_uuid"),
        username: row.get("username"),
        email: row.get("email"),
        profile_image: row.get("profile_image"),
        profile_image_url: None,
        created_at: row.get("created_at"),
    }
}

pub(crate) fn summary_from_row(row: &PgRow) -> UserSummary {
    UserSummary {
        username: row.get("username"),
        uuid: row.get("user_uuid"),
        profile_image: row.get("profile_image"),
        image: None,
    }
}
