use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::{validate_registration, User, DEFAULT_PROFILE_IMAGE};
use crate::domain::DomainError;
use crate::infra::db::Db;

const TOKEN_ISSUER: &str = "vitrine";

#[derive(Debug, Clone, Copy)]
pub struct AuthSession {
    pub user_id: i64,
    pub user_uuid: Uuid,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    access_key: [u8; 32],
    access_ttl_minutes: u64,
}

impl AuthService {
    pub fn new(db: Db, access_key: [u8; 32], access_ttl_minutes: u64) -> Self {
        Self {
            db,
            access_key,
            access_ttl_minutes,
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        validate_registration(username, email, password)?;

        let password_hash = hash_password(password)?;
        let result = sqlx::query(
            "INSERT INTO users (user_uuid, username, email, password_hash, profile_image) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_uuid, username, email, profile_image, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username.trim())
        .bind(email.trim().to_lowercase())
        .bind(password_hash)
        .bind(DEFAULT_PROFILE_IMAGE)
        .fetch_one(self.db.pool())
        .await;

        let row = match result {
            Ok(row) => row,
            Err(err) => return Err(map_unique_violation(err)),
        };

        Ok(User {
            id: row.get("id"),
            user_uuid: row.get("user_uuid"),
            username: row.get("username"),
            email: row.get("email"),
            profile_image: row.get("profile_image"),
            profile_image_url: None,
            created_at: row.get("created_at"),
        })
    }

    /// Accepts either the username or the email as `identifier`.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Option<AccessToken>> {
        let identifier = identifier.trim();
        let row = sqlx::query(
            "SELECT id, user_uuid, password_hash \
             FROM users WHERE username = $1 OR email = lower($1)",
        )
        .bind(identifier)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let password_hash: String = row.get("password_hash");
        if password_hash.is_empty() {
            return Ok(None);
        }
        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let token = self.issue_access_token(row.get("id"), row.get("user_uuid"))?;
        Ok(Some(token))
    }

    pub fn issue_access_token(&self, user_id: i64, user_uuid: Uuid) -> Result<AccessToken> {
        encrypt_access_token(&self.access_key, self.access_ttl_minutes, user_id, user_uuid)
    }

    pub fn authenticate_access_token(&self, token: &str) -> Result<Option<AuthSession>> {
        decrypt_access_token(&self.access_key, token)
    }
}

fn encrypt_access_token(
    key_bytes: &[u8; 32],
    ttl_minutes: u64,
    user_id: i64,
    user_uuid: Uuid,
) -> Result<AccessToken> {
    let duration = std::time::Duration::from_secs(ttl_minutes * 60);
    let mut claims = Claims::new_expires_in(&duration)?;
    claims.issuer(TOKEN_ISSUER)?;
    claims.audience(TOKEN_ISSUER)?;
    claims.subject(&user_uuid.to_string())?;
    claims.add_additional("uid", user_id)?;
    claims.add_additional("typ", "access")?;

    let key = SymmetricKey::<V4>::from(key_bytes)?;
    let access_token = local::encrypt(&key, &claims, None, None)?;
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes as i64);

    Ok(AccessToken {
        access_token,
        expires_at,
    })
}

fn decrypt_access_token(key_bytes: &[u8; 32], token: &str) -> Result<Option<AuthSession>> {
    let key = SymmetricKey::<V4>::from(key_bytes)?;
    let mut rules = ClaimsValidationRules::new();
    rules.validate_issuer_with(TOKEN_ISSUER);
    rules.validate_audience_with(TOKEN_ISSUER);

    let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
        Ok(token) => token,
        Err(_) => return Ok(None),
    };
    let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
        Ok(token) => token,
        Err(_) => return Ok(None),
    };
    let claims = match trusted.payload_claims() {
        Some(claims) => claims,
        None => return Ok(None),
    };
    if !has_token_type(claims, "access") {
        return Ok(None);
    }

    let user_uuid = claims
        .get_claim("sub")
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing sub claim"))?;
    let user_uuid = Uuid::parse_str(user_uuid)?;
    let user_id = claims
        .get_claim("uid")
        .and_then(|value| value.as_i64())
        .ok_or_else(|| anyhow!("missing uid claim"))?;

    Ok(Some(AuthSession { user_id, user_uuid }))
}

fn map_unique_violation(err: sqlx::Error) -> anyhow::Error {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or_default();
            if constraint.contains("users_username_key") {
                return DomainError::Conflict("username already taken".into()).into();
            }
            if constraint.contains("users_email_key") {
                return DomainError::Conflict("email already taken".into()).into();
            }
        }
    }
    err.into()
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
