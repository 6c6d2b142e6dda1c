//! Access token issuing and validation
//!
//! Access tokens are compact JWS strings: `base64url(header)`,
//! `base64url(claims)` and a MAC over the first two segments, joined by `.`.
//!
//! Security notes:
//! - Tokens are signed with HS256 using one shared secret
//! - Expiry is exclusive: a token is rejected from its `exp` second onwards
//! - Tokens are stateless and cannot be revoked individually. The only way to
//!   distrust an unexpired token is to change the signing secret.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::{crypto, Algorithm, DecodingKey, EncodingKey};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::types::{AuthError, ChirpyError};

/// Issuer label written into every access token
pub const ISSUER: &str = "chirpy";

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer label
    pub iss: String,
    /// User identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Message authentication seam for access tokens
///
/// `sign` returns the final token segment. `verify` must compare in constant
/// time.
pub trait TokenSigner: Send + Sync {
    /// Value of the `alg` header field
    fn algorithm(&self) -> &'static str;
    fn sign(&self, signing_input: &[u8]) -> Result<String, ChirpyError>;
    fn verify(&self, signing_input: &[u8], signature: &str) -> bool;
}

/// HMAC-SHA256 signer over a shared secret
#[derive(Clone)]
pub struct Hs256Signer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Hs256Signer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl TokenSigner for Hs256Signer {
    fn algorithm(&self) -> &'static str {
        "HS256"
    }

    fn sign(&self, signing_input: &[u8]) -> Result<String, ChirpyError> {
        crypto::sign(signing_input, &self.encoding_key, Algorithm::HS256)
            .map_err(|e| ChirpyError::Internal(format!("Failed to sign token: {}", e)))
    }

    fn verify(&self, signing_input: &[u8], signature: &str) -> bool {
        crypto::verify(signature, signing_input, &self.decoding_key, Algorithm::HS256)
            .unwrap_or(false)
    }
}

/// Access token generator and validator
#[derive(Clone)]
pub struct AccessTokenIssuer<S: TokenSigner = Hs256Signer> {
    signer: S,
}

impl AccessTokenIssuer<Hs256Signer> {
    /// Create an HS256 issuer for a shared secret
    pub fn hs256(secret: &str) -> Self {
        Self::new(Hs256Signer::new(secret))
    }
}

impl<S: TokenSigner> AccessTokenIssuer<S> {
    pub fn new(signer: S) -> Self {
        Self { signer }
    }

    /// Issue a token for `user_id` valid for `ttl_seconds` from now
    ///
    /// A non-positive TTL yields a token that is already expired.
    pub fn issue(&self, user_id: &str, ttl_seconds: i64) -> Result<String, ChirpyError> {
        self.issue_at(user_id, ttl_seconds, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: &str,
        ttl_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<String, ChirpyError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: Some(user_id.to_string()),
            iat,
            exp: iat.saturating_add(ttl_seconds),
        };
        let header = TokenHeader {
            alg: self.signer.algorithm().to_string(),
            typ: Some("JWT".to_string()),
        };

        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = self.signer.sign(signing_input.as_bytes())?;

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Validate a token and return its subject
    ///
    /// The subject is not checked against any user store.
    pub fn validate(&self, token: &str) -> Result<String, AuthError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = self.verified_claims(token)?;

        if now.timestamp() >= claims.exp {
            debug!("Rejected expired access token");
            return Err(AuthError::Expired);
        }

        match claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(AuthError::MissingSubject),
        }
    }

    /// Check structure and signature, then decode the claims
    fn verified_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        let &[header, payload, signature] = &segments[..] else {
            return Err(AuthError::MalformedToken);
        };

        let header: TokenHeader = decode_segment(header)?;
        if header.alg != self.signer.algorithm() {
            return Err(AuthError::MalformedToken);
        }

        let signing_input = &token[..token.len() - signature.len() - 1];
        if !self.signer.verify(signing_input.as_bytes(), signature) {
            debug!("Rejected access token with bad signature");
            return Err(AuthError::InvalidSignature);
        }

        let claims: Claims = decode_segment(payload)?;
        if claims.iss != ISSUER {
            return Err(AuthError::MalformedToken);
        }

        Ok(claims)
    }
}

/// Issue an HS256 access token (one-shot form)
pub fn make_jwt(user_id: &str, ttl_seconds: i64, secret: &str) -> Result<String, ChirpyError> {
    AccessTokenIssuer::hs256(secret).issue(user_id, ttl_seconds)
}

/// Validate an HS256 access token and return the user id (one-shot form)
pub fn validate_jwt(token: &str, secret: &str) -> Result<String, AuthError> {
    AccessTokenIssuer::hs256(secret).validate(token)
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, ChirpyError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| ChirpyError::Internal(format!("Failed to encode token segment: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}
