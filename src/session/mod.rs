//! Session-token boundary
//!
//! Token issuance and storage live elsewhere; this side only turns an
//! opaque bearer token into a validated user identity. Tokens are stored
//! hashed, so lookups go through the SHA-256 hex digest of the presented
//! value.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::MySqlPool;

/// A validated session identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: i64,
    pub expires_at: Option<DateTime<Utc>>,
    /// Ability scope attached at token issuance ("*" means unrestricted)
    pub abilities: Vec<String>,
}

impl SessionIdentity {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Hex SHA-256 digest of a raw bearer token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve an opaque bearer token to an identity. `None` means the
    /// token is unknown or expired.
    async fn validate_token(&self, token: &str) -> Result<Option<SessionIdentity>>;
}

#[derive(sqlx::FromRow)]
struct AccessTokenRow {
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
    abilities: Option<String>,
}

pub struct SessionStoreImpl {
    pool: MySqlPool,
}

impl SessionStoreImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionStoreImpl {
    async fn validate_token(&self, token: &str) -> Result<Option<SessionIdentity>> {
        let row = sqlx::query_as::<_, AccessTokenRow>(
            "SELECT user_id, expires_at, abilities FROM access_tokens WHERE token_hash = ?",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let identity = SessionIdentity {
            user_id: row.user_id,
            expires_at: row.expires_at,
            abilities: row
                .abilities
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
        };

        if identity.is_expired_at(Utc::now()) {
            return Ok(None);
        }

        Ok(Some(identity))
    }
}
