//! MongoDB-backed `AuthStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::auth::RefreshTokenRecord;
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    Metadata, RefreshTokenDoc, UserDoc, REFRESH_TOKEN_COLLECTION, USER_COLLECTION,
};
use crate::db::{AuthStore, NewUser, User};
use crate::types::Result;

/// Users and refresh tokens in two MongoDB collections
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    refresh_tokens: MongoCollection<RefreshTokenDoc>,
}

impl MongoStore {
    /// Open both collections, creating their indexes
    pub async fn connect(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
            refresh_tokens: client.collection(REFRESH_TOKEN_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl AuthStore for MongoStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(bson::doc! { "email": email })
            .await?
            .map(UserDoc::into_user))
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(UserDoc::id_filter(id))
            .await?
            .map(UserDoc::into_user))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let user_id = uuid::Uuid::new_v4().to_string();
        let mut doc = UserDoc::new(user_id, user.email, user.hashed_password);
        doc.metadata = Metadata::at(bson::DateTime::now());

        self.users.insert_one(doc.clone()).await?;
        Ok(doc.into_user())
    }

    async fn update_user(
        &self,
        id: &str,
        email: Option<String>,
        hashed_password: Option<String>,
    ) -> Result<Option<User>> {
        let update = UserDoc::credential_update(email, hashed_password, bson::DateTime::now());
        Ok(self
            .users
            .find_one_and_update(UserDoc::id_filter(id), update)
            .await?
            .map(UserDoc::into_user))
    }

    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> Result<()> {
        self.refresh_tokens
            .insert_one(RefreshTokenDoc::from(record))
            .await?;
        Ok(())
    }

    async fn find_active_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let filter = RefreshTokenDoc::active_filter(token, bson::DateTime::from_chrono(now));
        Ok(self
            .refresh_tokens
            .find_one(filter)
            .await?
            .map(|doc| doc.user_id))
    }

    async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<()> {
        let result = self
            .refresh_tokens
            .update_one(
                RefreshTokenDoc::unrevoked_filter(token),
                RefreshTokenDoc::revoke_update(bson::DateTime::from_chrono(now)),
            )
            .await?;

        debug!(matched = result.matched_count, "Refresh token revoke applied");
        Ok(())
    }
}
