//! Error types for chirpy-auth
//!
//! `AuthError` is the closed set of expected authentication outcomes. Callers
//! branch on the variant, never on the message. `ChirpyError` adds the
//! infrastructure failures (store, configuration) that are fatal to a request
//! but unrelated to the credentials presented.

use hyper::StatusCode;

/// Authentication failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredential,

    #[error("Invalid Authorization header format")]
    MalformedCredential,

    #[error("Malformed access token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token has no subject")]
    MissingSubject,

    #[error("Incorrect email or password")]
    PasswordMismatch,

    #[error("Invalid or expired refresh token")]
    TokenNotActive,

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Main error type for chirpy-auth operations
#[derive(Debug, thiserror::Error)]
pub enum ChirpyError {
    #[error("Unauthorized: {0}")]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChirpyError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The authentication kind, if this is an authentication failure
    pub fn auth_kind(&self) -> Option<AuthError> {
        match self {
            Self::Auth(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = match &self {
            // Storage and internal details stay server-side
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                "Something went wrong on our end".to_string()
            }
            _ => self.to_string(),
        };
        (status, body)
    }
}

impl From<tokio::task::JoinError> for ChirpyError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Background task failed: {}", err))
    }
}

/// Result type alias for chirpy-auth operations
pub type Result<T> = std::result::Result<T, ChirpyError>;
