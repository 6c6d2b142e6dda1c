//! User document schema
//!
//! Stores user credentials and the premium flag.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::db::User;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Public user identifier (uuid)
    pub user_id: String,

    pub email: String,

    /// Argon2 password hash
    pub hashed_password: String,

    #[serde(default)]
    pub is_chirpy_red: bool,
}

impl UserDoc {
    pub fn new(user_id: String, email: String, hashed_password: String) -> Self {
        Self {
            id: None,
            metadata: Metadata::default(),
            user_id,
            email,
            hashed_password,
            is_chirpy_red: false,
        }
    }

    /// Filter selecting a user by public id
    pub fn id_filter(user_id: &str) -> Document {
        doc! { "user_id": user_id }
    }

    /// `$set` for the credential fields that are present, plus `updated_at`
    pub fn credential_update(
        email: Option<String>,
        hashed_password: Option<String>,
        now: DateTime,
    ) -> Document {
        let mut set = doc! { "metadata.updated_at": now };
        if let Some(email) = email {
            set.insert("email", email);
        }
        if let Some(hashed_password) = hashed_password {
            set.insert("hashed_password", hashed_password);
        }
        doc! { "$set": set }
    }

    pub fn into_user(self) -> User {
        User {
            id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
            is_chirpy_red: self.is_chirpy_red,
            created_at: self
                .metadata
                .created_at
                .map(|d| d.to_chrono())
                .unwrap_or_default(),
            updated_at: self
                .metadata
                .updated_at
                .map(|d| d.to_chrono())
                .unwrap_or_default(),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_user_carries_timestamps() {
        let now = bson::DateTime::now();
        let mut doc = UserDoc::new("u1".into(), "a@example.com".into(), "$argon2id$x".into());
        *doc.mut_metadata() = Metadata::at(now);

        let user = doc.into_user();
        assert_eq!(user.id, "u1");
        assert!(!user.is_chirpy_red);
        assert_eq!(user.created_at, now.to_chrono());
    }

    #[test]
    fn test_credential_update_sets_only_given_fields() {
        let now = DateTime::now();

        let update = UserDoc::credential_update(None, Some("$argon2id$new".into()), now);
        assert_eq!(
            update,
            doc! { "$set": { "metadata.updated_at": now, "hashed_password": "$argon2id$new" } }
        );

        let update = UserDoc::credential_update(Some("b@example.com".into()), None, now);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("email").unwrap(), "b@example.com");
        assert!(!set.contains_key("hashed_password"));
        assert_eq!(set.get_datetime("metadata.updated_at").unwrap(), &now);
    }

    #[test]
    fn test_email_index_is_unique() {
        let indices = UserDoc::into_indices();
        let (keys, opts) = &indices[0];
        assert_eq!(keys, &doc! { "email": 1 });
        assert_eq!(opts.as_ref().and_then(|o| o.unique), Some(true));
    }
}
