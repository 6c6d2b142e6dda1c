//! Refresh token lifecycle
//!
//! Refresh tokens are 32 random bytes rendered as 64 lowercase hex characters.
//! They are opaque: all state (owner, expiry, revocation) lives in the store.
//!
//! A token is active iff it has not been revoked and its `expires_at` lies
//! strictly in the future. `expires_at` is fixed at creation and revocation is
//! terminal. Unknown, expired and revoked tokens all fail validation with the
//! same `TokenNotActive` kind.
//!
//! Store requirements: the active lookup and the revoke update must each be
//! atomic, and the token column must be unique. Expired rows are never swept;
//! they are simply inactive on read.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DEFAULT_REFRESH_TOKEN_TTL_DAYS;
use crate::db::AuthStore;
use crate::types::{AuthError, Result};

/// Number of random bytes in a refresh token
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new refresh token string
///
/// Collisions are not retried; the store's unique index is the backstop.
pub fn make_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Persisted refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(token: String, user_id: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token,
            user_id,
            expires_at: now + ttl,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    /// Mark revoked; an existing revocation time is kept
    pub fn revoke(&mut self, now: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(now);
            self.updated_at = now;
        }
    }
}

/// Issues, validates and revokes refresh tokens against a store
pub struct RefreshTokenManager<S: AuthStore> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S: AuthStore> Clone for RefreshTokenManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ttl: self.ttl,
        }
    }
}

impl<S: AuthStore> RefreshTokenManager<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Manager with the default 60 day lifetime
    pub fn with_default_ttl(store: Arc<S>) -> Self {
        Self::new(store, Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS))
    }

    /// Generate a token string without persisting it
    pub fn issue(&self) -> String {
        make_refresh_token()
    }

    /// Build the record for a freshly issued token
    pub fn record_for(&self, token: String, user_id: &str, now: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord::new(token, user_id.to_string(), now, self.ttl)
    }

    /// Generate a token for `user_id` and persist it
    pub async fn issue_for(&self, user_id: &str) -> Result<String> {
        let token = self.issue();
        let record = self.record_for(token.clone(), user_id, Utc::now());
        self.store.create_refresh_token(record).await?;

        info!(user_id = %user_id, "Issued refresh token");
        Ok(token)
    }

    /// Resolve an active token to its user id
    pub async fn validate(&self, token: &str) -> Result<String> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<String> {
        match self.store.find_active_refresh_token(token, now).await? {
            Some(user_id) => Ok(user_id),
            None => {
                debug!("Refresh token not active");
                Err(AuthError::TokenNotActive.into())
            }
        }
    }

    /// Revoke a token; unknown tokens are a silent no-op
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.store.revoke_refresh_token(token, Utc::now()).await?;
        info!("Refresh token revocation recorded");
        Ok(())
    }
}
