//! chirpy-auth - authentication and session lifecycle for the Chirpy API
//!
//! Verifies passwords, issues and validates short-lived access tokens, and
//! issues, validates and revokes long-lived refresh tokens. Every check fails
//! closed and reports a distinguishable [`AuthError`] kind.
//!
//! ## Components
//!
//! - **Credential extraction**: `Authorization: Bearer` / `ApiKey` parsing
//! - **Password hashing**: Argon2id with per-hash random salt
//! - **Access tokens**: HS256 signed claims with exclusive expiry
//! - **Refresh tokens**: opaque 256-bit tokens persisted through an [`db::AuthStore`]
//! - **Authorization gate**: bearer token to user id for authenticated endpoints

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod types;

pub use config::{Args, AuthConfig};
pub use types::{AuthError, ChirpyError, Result};
