//! Authorization header parsing
//!
//! Two schemes share the `Authorization` header:
//! - `Bearer <token>` carries an access token or a refresh token
//! - `ApiKey <key>` carries the pre-shared operator key used by webhooks

use hyper::header::AUTHORIZATION;
use hyper::HeaderMap;

use crate::types::AuthError;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Extract the bearer token from request headers
pub fn get_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    extract_credential(headers, BEARER_SCHEME)
}

/// Extract the API key from request headers
pub fn get_api_key(headers: &HeaderMap) -> Result<&str, AuthError> {
    extract_credential(headers, API_KEY_SCHEME)
}

fn extract_credential<'a>(headers: &'a HeaderMap, scheme: &str) -> Result<&'a str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    parse_authorization(value, scheme)
}

/// Split an Authorization header value into `<scheme> <credential>`
///
/// Exactly two whitespace-separated parts are accepted and the scheme is
/// compared case-sensitively. The credential is returned verbatim.
pub fn parse_authorization<'a>(value: &'a str, scheme: &str) -> Result<&'a str, AuthError> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(found), Some(credential), None) if found == scheme => Ok(credential),
        _ => Err(AuthError::MalformedCredential),
    }
}

/// Check a presented API key against the configured one
///
/// An empty configured key never matches.
pub fn api_key_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && constant_time_compare(presented, expected)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
