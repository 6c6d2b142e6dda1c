//! Request authorization
//!
//! The single entry point authenticated endpoints use to learn which user is
//! calling: bearer token extraction followed by access token validation. The
//! first failure is returned unchanged.

use hyper::HeaderMap;
use tracing::debug;

use crate::auth::credentials::get_bearer_token;
use crate::auth::jwt::{AccessTokenIssuer, Hs256Signer, TokenSigner};
use crate::types::AuthError;

#[derive(Clone)]
pub struct AuthorizationGate<S: TokenSigner = Hs256Signer> {
    issuer: AccessTokenIssuer<S>,
}

impl<S: TokenSigner> AuthorizationGate<S> {
    pub fn new(issuer: AccessTokenIssuer<S>) -> Self {
        Self { issuer }
    }

    /// Resolve the calling user id from request headers
    pub fn authorize(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let token = get_bearer_token(headers)?;
        let user_id = self.issuer.validate(token)?;
        debug!(user_id = %user_id, "Request authorized");
        Ok(user_id)
    }
}

/// Authorize a request against an HS256 secret (one-shot form)
pub fn authorize(headers: &HeaderMap, secret: &str) -> Result<String, AuthError> {
    AuthorizationGate::new(AccessTokenIssuer::hs256(secret)).authorize(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::make_jwt;
    use hyper::header::{HeaderValue, AUTHORIZATION};

    const SECRET: &str = "my-secret-key";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_authorize_valid_token() {
        let token = make_jwt("user123", 3600, SECRET).unwrap();
        assert_eq!(authorize(&bearer(&token), SECRET), Ok("user123".to_string()));
    }

    #[test]
    fn test_header_failures_propagate() {
        assert_eq!(
            authorize(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredential)
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(authorize(&headers, SECRET), Err(AuthError::MalformedCredential));
    }

    #[test]
    fn test_token_failures_propagate() {
        let token = make_jwt("user123", 3600, SECRET).unwrap();
        assert_eq!(
            authorize(&bearer(&token), "wrong-secret"),
            Err(AuthError::InvalidSignature)
        );

        let expired = make_jwt("user123", 0, SECRET).unwrap();
        assert_eq!(authorize(&bearer(&expired), SECRET), Err(AuthError::Expired));

        assert_eq!(
            authorize(&bearer("not.a.valid.jwt"), SECRET),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let refresh = crate::auth::make_refresh_token();
        assert_eq!(
            authorize(&bearer(&refresh), SECRET),
            Err(AuthError::MalformedToken)
        );
    }
}
