//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with the crate's recommended parameters. The
//! PHC-formatted output embeds algorithm, parameters, a fresh random salt and
//! the derived key, so verification needs nothing but the stored string.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::debug;

use crate::types::ChirpyError;

/// Argon2id hash with default parameters that no password is expected to match
///
/// Verified against when a login names an unknown account, so that path costs
/// the same as a wrong password.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$9DC2KNjinYY7SL3KMAZSIw$vKbSTznNgjpqLiP97qO79f8UroJ85OtDmTdLfI2nN7w";

/// Password hashing algorithm seam
///
/// `verify` answers only yes or no. A hash string that cannot be parsed is a
/// mismatch, not an error.
pub trait PasswordAlgorithm: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, ChirpyError>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id hasher with default parameters
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordAlgorithm for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, ChirpyError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ChirpyError::Internal(format!("Failed to hash password: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Stored password hash is not a PHC string: {e}");
                return false;
            }
        };

        // Output comparison inside verify_password is constant-time
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, ChirpyError> {
    Argon2Hasher::new().hash(password)
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    Argon2Hasher::new().verify(password, hash)
}
