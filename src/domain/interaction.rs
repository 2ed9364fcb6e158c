use serde::Serialize;

/// The two mutually exclusive reactions a user can have on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn table(self) -> &'static str {
        match self {
            Self::Like => "post_likes",
            Self::Dislike => "post_dislikes",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Like => Self::Dislike,
            Self::Dislike => Self::Like,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    pub likes: i64,
    pub dislikes: i64,
}

/// State of one reaction after a toggle, plus the post's fresh totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionToggle {
    pub reaction: Reaction,
    pub active: bool,
    pub counts: ReactionCounts,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Serialize)]
pub struct DislikeResponse {
    pub disliked: bool,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommentLikeToggle {
    pub liked: bool,
    pub likes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowToggle {
    pub following: bool,
    pub followers: i64,
    pub following_count: i64,
}

impl From<ReactionToggle> for LikeResponse {
    fn from(toggle: ReactionToggle) -> Self {
        Self {
            liked: toggle.reaction == Reaction::Like && toggle.active,
            likes: toggle.counts.likes,
            dislikes: toggle.counts.dislikes,
        }
    }
}

impl From<ReactionToggle> for DislikeResponse {
    fn from(toggle: ReactionToggle) -> Self {
        Self {
            disliked: toggle.reaction == Reaction::Dislike && toggle.active,
            likes: toggle.counts.likes,
            dislikes: toggle.counts.dislikes,
        }
    }
}
