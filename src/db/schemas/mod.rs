//! MongoDB document schemas

pub mod metadata;
pub mod refresh_token;
pub mod user;

pub use metadata::Metadata;
pub use refresh_token::{RefreshTokenDoc, REFRESH_TOKEN_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
