//! Refresh token document schema
//!
//! One document per issued refresh token. The token string is unique, which
//! is the collision backstop for token generation.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::RefreshTokenRecord;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for refresh tokens
pub const REFRESH_TOKEN_COLLECTION: &str = "refresh_tokens";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RefreshTokenDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// 64 hex character token string
    pub token: String,

    /// Owning user (UserDoc.user_id)
    pub user_id: String,

    /// Fixed at creation, never extended
    pub expires_at: DateTime,

    /// Set once on revocation, never cleared
    #[serde(default)]
    pub revoked_at: Option<DateTime>,
}

impl RefreshTokenDoc {
    /// Filter matching the token only while it is active at `now`
    pub fn active_filter(token: &str, now: DateTime) -> Document {
        doc! {
            "token": token,
            "revoked_at": null,
            "expires_at": { "$gt": now },
        }
    }

    /// Filter matching the token only while it is unrevoked
    pub fn unrevoked_filter(token: &str) -> Document {
        doc! {
            "token": token,
            "revoked_at": null,
        }
    }

    /// Update setting the revocation time
    pub fn revoke_update(now: DateTime) -> Document {
        doc! {
            "$set": {
                "revoked_at": now,
                "metadata.updated_at": now,
            }
        }
    }

}

impl From<RefreshTokenRecord> for RefreshTokenDoc {
    fn from(record: RefreshTokenRecord) -> Self {
        Self {
            id: None,
            metadata: Metadata {
                created_at: Some(DateTime::from_chrono(record.created_at)),
                updated_at: Some(DateTime::from_chrono(record.updated_at)),
            },
            token: record.token,
            user_id: record.user_id,
            expires_at: DateTime::from_chrono(record.expires_at),
            revoked_at: record.revoked_at.map(DateTime::from_chrono),
        }
    }
}

impl IntoIndexes for RefreshTokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the token string
            (
                doc! { "token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for RefreshTokenDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
