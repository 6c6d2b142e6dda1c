//! Persistence contract for users and refresh tokens
//!
//! The auth components only ever talk to an [`AuthStore`]. Implementations
//! must make `find_active_refresh_token` a single conjunctive check (token
//! matches, not revoked, not expired) and `revoke_refresh_token` a single
//! conditional update, each atomic with respect to concurrent requests.
//! Races between the two are settled by the store's isolation, not here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::auth::RefreshTokenRecord;
use crate::types::{ChirpyError, Result};

/// Stored user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
}

#[async_trait]
pub trait AuthStore: Send + Sync + 'static {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Fails with a database error if the email is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Replace the given credential fields and bump `updated_at`
    ///
    /// `None` if no user has that id. Fails with a database error if the new
    /// email is taken by another user.
    async fn update_user(
        &self,
        id: &str,
        email: Option<String>,
        hashed_password: Option<String>,
    ) -> Result<Option<User>>;

    /// Fails with a database error if the token string already exists
    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> Result<()>;

    /// User id of the token if it is unrevoked and `expires_at > now`
    async fn find_active_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>>;

    /// Set `revoked_at = now` on a matching unrevoked token; no match is not an error
    async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<()>;
}

/// In-process store backed by concurrent maps
///
/// Each operation touches one map entry under its shard lock, which gives the
/// per-row atomicity the contract asks for.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    user_ids_by_email: DashMap<String, String>,
    refresh_tokens: DashMap<String, RefreshTokenRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full record for a token, including inactive ones
    pub fn refresh_token(&self, token: &str) -> Option<RefreshTokenRecord> {
        self.refresh_tokens.get(token).map(|r| r.value().clone())
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(id) = self.user_ids_by_email.get(email).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        match self.user_ids_by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(ChirpyError::Database(format!(
                "duplicate key: email {}",
                user.email
            ))),
            Entry::Vacant(slot) => {
                let created = User {
                    id: id.clone(),
                    email: user.email,
                    hashed_password: user.hashed_password,
                    is_chirpy_red: false,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(id.clone(), created.clone());
                slot.insert(id);
                Ok(created)
            }
        }
    }

    async fn update_user(
        &self,
        id: &str,
        email: Option<String>,
        hashed_password: Option<String>,
    ) -> Result<Option<User>> {
        let Some(old_email) = self.users.get(id).map(|u| u.email.clone()) else {
            return Ok(None);
        };
        let email = email.filter(|email| *email != old_email);

        // New email is claimed before the old one is released
        if let Some(email) = &email {
            match self.user_ids_by_email.entry(email.clone()) {
                Entry::Occupied(_) => {
                    return Err(ChirpyError::Database(format!(
                        "duplicate key: email {}",
                        email
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                }
            }
        }

        let updated = {
            let Some(mut user) = self.users.get_mut(id) else {
                return Ok(None);
            };
            if let Some(email) = email.clone() {
                user.email = email;
            }
            if let Some(hashed_password) = hashed_password {
                user.hashed_password = hashed_password;
            }
            user.updated_at = Utc::now();
            user.value().clone()
        };

        if email.is_some() {
            self.user_ids_by_email
                .remove_if(&old_email, |_, owner| owner.as_str() == id);
        }
        Ok(Some(updated))
    }

    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> Result<()> {
        match self.refresh_tokens.entry(record.token.clone()) {
            Entry::Occupied(_) => Err(ChirpyError::Database(
                "duplicate key: refresh token".into(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find_active_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        Ok(self
            .refresh_tokens
            .get(token)
            .filter(|record| record.is_active(now))
            .map(|record| record.user_id.clone()))
    }

    async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<()> {
        if let Some(mut record) = self.refresh_tokens.get_mut(token) {
            record.revoke(now);
        }
        Ok(())
    }
}
