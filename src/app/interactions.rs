use anyhow::Result;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::app::posts::PostService;
use crate::app::users::UserService;
use crate::domain::interaction::{
    CommentLikeToggle, FollowToggle, Reaction, ReactionCounts, ReactionToggle,
};
use crate::domain::DomainError;
use crate::infra::db::Db;

/// Likes, dislikes, comment likes and follows.
///
/// Every toggle runs in a transaction that holds the actor's row lock, so
/// repeated or concurrent requests from one user flip state one at a time
/// and the counts returned are the ones that toggle produced.
#[derive(Clone)]
pub struct InteractionService {
    db: Db,
    posts: PostService,
    users: UserService,
}

impl InteractionService {
    pub fn new(db: Db) -> Self {
        Self {
            posts: PostService::new(db.clone()),
            users: UserService::new(db.clone()),
            db,
        }
    }

    pub async fn toggle_like(&self, user_id: i64, post_uuid: Uuid) -> Result<ReactionToggle> {
        self.toggle_reaction(user_id, post_uuid, Reaction::Like).await
    }

    pub async fn toggle_dislike(&self, user_id: i64, post_uuid: Uuid) -> Result<ReactionToggle> {
        self.toggle_reaction(user_id, post_uuid, Reaction::Dislike).await
    }

    async fn toggle_reaction(
        &self,
        user_id: i64,
        post_uuid: Uuid,
        reaction: Reaction,
    ) -> Result<ReactionToggle> {
        let post = self.posts.require_post(post_uuid).await?;
        let mut tx = self.db.begin_for_actor(user_id).await?;

        // A like and a dislike on the same post never coexist.
        sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND post_id = $2",
            reaction.opposite().table()
        ))
        .bind(user_id)
        .bind(post.id)
        .execute(&mut *tx)
        .await?;

        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND post_id = $2",
            reaction.table()
        ))
        .bind(user_id)
        .bind(post.id)
        .execute(&mut *tx)
        .await?;

        let active = removed.rows_affected() == 0;
        if active {
            sqlx::query(&format!(
                "INSERT INTO {} (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                reaction.table()
            ))
            .bind(user_id)
            .bind(post.id)
            .execute(&mut *tx)
            .await?;
        }

        let counts = reaction_counts(&mut tx, post.id).await?;
        tx.commit().await?;

        Ok(ReactionToggle {
            reaction,
            active,
            counts,
        })
    }

    pub async fn toggle_comment_like(&self, user_id: i64, comment_id: i64) -> Result<CommentLikeToggle> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)")
            .bind(comment_id)
            .fetch_one(self.db.pool())
            .await?;
        if !exists {
            return Err(DomainError::NotFound("comment").into());
        }

        let mut tx = self.db.begin_for_actor(user_id).await?;

        let removed = sqlx::query("DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2")
            .bind(user_id)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        let liked = removed.rows_affected() == 0;
        if liked {
            sqlx::query(
                "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        }

        let likes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1")
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(CommentLikeToggle { liked, likes })
    }

    /// `followers` is the target's follower count and `following_count` the
    /// number of users the target follows.
    pub async fn toggle_follow(&self, follower_id: i64, target_uuid: Uuid) -> Result<FollowToggle> {
        let target = self.users.require_by_uuid(target_uuid).await?;
        if target.id == follower_id {
            return Err(DomainError::invalid("cannot follow yourself").into());
        }

        let mut tx = self.db.begin_for_actor(follower_id).await?;

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(target.id)
            .execute(&mut *tx)
            .await?;

        let following = removed.rows_affected() == 0;
        if following {
            sqlx::query(
                "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(follower_id)
            .bind(target.id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM follows WHERE following_id = $1) AS followers, \
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following_count",
        )
        .bind(target.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(FollowToggle {
            following,
            followers: row.get("followers"),
            following_count: row.get("following_count"),
        })
    }
}

async fn reaction_counts(tx: &mut Transaction<'static, Postgres>, post_id: i64) -> Result<ReactionCounts> {
    let row = sqlx::query(
        "SELECT \
            (SELECT COUNT(*) FROM post_likes WHERE post_id = $1) AS likes, \
            (SELECT COUNT(*) FROM post_dislikes WHERE post_id = $1) AS dislikes",
    )
    .bind(post_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(ReactionCounts {
        likes: row.get("likes"),
        dislikes: row.get("dislikes"),
    })
}
