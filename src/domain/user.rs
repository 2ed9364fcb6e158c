use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::DomainError;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 128;
pub const DEFAULT_PROFILE_IMAGE: &str = "egg.png";

#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub user_uuid: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub profile_image: String,
    /// Resolved at response time from `profile_image`.
    pub profile_image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What other users get to see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub user_uuid: Uuid,
    pub username: String,
    pub profile_image_url: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            user_uuid: user.user_uuid,
            username: user.username,
            profile_image_url: user.profile_image_url,
        }
    }
}

/// Entry in follower/following and conversation lists.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub uuid: Uuid,
    #[serde(skip_serializing)]
    pub profile_image: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct FollowCounts {
    pub followers_count: i64,
    pub following_count: i64,
}

pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), DomainError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DomainError::invalid("username cannot be empty"));
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(DomainError::invalid(format!(
            "username must be at most {} characters",
            USERNAME_MAX_CHARS
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(DomainError::invalid("username cannot contain whitespace"));
    }

    let email = email.trim();
    if email.is_empty() {
        return Err(DomainError::invalid("email cannot be empty"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(DomainError::invalid("email is not valid")),
    }

    let password_len = password.chars().count();
    if password.trim().chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::invalid("password must be at least 8 characters"));
    }
    if password_len > PASSWORD_MAX_CHARS {
        return Err(DomainError::invalid("password must be at most 128 characters"));
    }

    Ok(())
}
