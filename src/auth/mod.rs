//! Authentication and session lifecycle for Chirpy
//!
//! Provides:
//! - Password hashing with Argon2
//! - Authorization header parsing (Bearer and ApiKey schemes)
//! - Access token generation and validation (HS256)
//! - Refresh token issuing, validation and revocation
//! - The authorization gate used by authenticated endpoints
//! - Login / refresh / revoke and credential-change flows composing the above

pub mod credentials;
pub mod gate;
pub mod jwt;
pub mod password;
pub mod refresh;
pub mod session;

pub use credentials::{api_key_matches, get_api_key, get_bearer_token, parse_authorization};
pub use gate::{authorize, AuthorizationGate};
pub use jwt::{make_jwt, validate_jwt, AccessTokenIssuer, Claims, Hs256Signer, TokenSigner, ISSUER};
pub use password::{hash_password, verify_password, Argon2Hasher, PasswordAlgorithm, DUMMY_HASH};
pub use refresh::{make_refresh_token, RefreshTokenManager, RefreshTokenRecord};
pub use session::{LoginOutcome, SessionService};
