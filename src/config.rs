//! Configuration for chirpy-auth
//!
//! CLI arguments and environment variable handling using clap. `Args` is parsed
//! once at process start and turned into an [`AuthConfig`], which is the only
//! configuration value the auth components ever see.

use clap::{Parser, Subcommand};
use std::fmt;

use crate::types::ChirpyError;

/// Secret used when running with `PLATFORM=dev` and no JWT_SECRET set
const DEV_JWT_SECRET: &str = "dev-only-insecure-secret";

/// Default access token lifetime (one hour)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Default refresh token lifetime
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// chirpy-auth - credential and session tooling for the Chirpy API
#[derive(Parser, Debug, Clone)]
#[command(name = "chirpy-auth")]
#[command(about = "Password hashing, access tokens and refresh tokens for Chirpy")]
pub struct Args {
    /// Shared HMAC secret for signing access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Pre-shared key expected in `Authorization: ApiKey <key>` headers
    #[arg(long, env = "POLKA_KEY", hide_env_values = true)]
    pub polka_key: Option<String>,

    /// Deployment platform ("dev" relaxes secret requirements)
    #[arg(long, env = "PLATFORM", default_value = "production")]
    pub platform: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECONDS", default_value_t = DEFAULT_ACCESS_TOKEN_TTL_SECONDS)]
    pub access_token_ttl_seconds: i64,

    /// Refresh token lifetime in days
    #[arg(long, env = "REFRESH_TOKEN_TTL_DAYS", default_value_t = DEFAULT_REFRESH_TOKEN_TTL_DAYS)]
    pub refresh_token_ttl_days: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "chirpy")]
    pub mongodb_db: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Hash a password into a self-describing Argon2id string
    HashPassword { password: String },

    /// Check a password against a stored hash
    VerifyPassword { password: String, hash: String },

    /// Issue an access token for a user id
    IssueToken {
        user_id: String,
        /// Override the configured lifetime
        #[arg(long)]
        ttl_seconds: Option<i64>,
    },

    /// Validate an access token and print its subject
    ValidateToken { token: String },

    /// Generate a refresh token string (not persisted)
    NewRefreshToken,

    /// Create a user in MongoDB
    Register { email: String, password: String },

    /// Log a user in and print the issued token pair
    Login { email: String, password: String },

    /// Exchange a refresh token for a new access token
    Refresh {
        /// Authorization header value, e.g. "Bearer <refresh token>"
        authorization: String,
    },

    /// Revoke a refresh token
    Revoke {
        /// Authorization header value, e.g. "Bearer <refresh token>"
        authorization: String,
    },

    /// Change the email and/or password of the access token's user
    UpdateUser {
        /// Authorization header value, e.g. "Bearer <access token>"
        authorization: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
}

impl Args {
    pub fn is_dev(&self) -> bool {
        self.platform == "dev"
    }

    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Some(secret.to_string()),
            _ if self.is_dev() => Some(DEV_JWT_SECRET.to_string()),
            _ => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret().is_none() {
            return Err("JWT_SECRET is required outside PLATFORM=dev".to_string());
        }

        if self.access_token_ttl_seconds <= 0 {
            return Err("ACCESS_TOKEN_TTL_SECONDS must be positive".to_string());
        }

        if self.refresh_token_ttl_days <= 0 {
            return Err("REFRESH_TOKEN_TTL_DAYS must be positive".to_string());
        }

        Ok(())
    }

    /// Build the auth configuration value handed to every component
    pub fn auth_config(&self) -> Result<AuthConfig, ChirpyError> {
        self.validate().map_err(ChirpyError::Config)?;
        let jwt_secret = self
            .jwt_secret()
            .ok_or_else(|| ChirpyError::Config("JWT_SECRET is required".into()))?;

        Ok(AuthConfig::new(jwt_secret)?
            .with_api_key_secret(self.polka_key.clone().unwrap_or_default())
            .with_access_token_ttl(self.access_token_ttl_seconds)
            .with_refresh_token_ttl(chrono::Duration::days(self.refresh_token_ttl_days)))
    }
}

/// Explicit auth configuration, constructed once at startup
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    api_key_secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl: chrono::Duration,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes
    ///
    /// Returns an error if the signing secret is empty.
    pub fn new(jwt_secret: impl Into<String>) -> Result<Self, ChirpyError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.is_empty() {
            return Err(ChirpyError::Config("JWT secret must not be empty".into()));
        }

        Ok(Self {
            jwt_secret,
            api_key_secret: String::new(),
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl: chrono::Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
        })
    }

    pub fn with_api_key_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_key_secret = secret.into();
        self
    }

    pub fn with_access_token_ttl(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Empty when no API key is configured; such a config rejects every key.
    pub fn api_key_secret(&self) -> &str {
        &self.api_key_secret
    }

    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        self.refresh_token_ttl
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("api_key_secret", &"<redacted>")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["chirpy-auth"];
        argv.extend_from_slice(args);
        argv.push("new-refresh-token");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_missing_secret_rejected_in_production() {
        let args = parse(&["--platform", "production", "--jwt-secret", ""]);
        assert_eq!(args.jwt_secret(), None);
        assert!(args.validate().is_err());
        assert!(args.auth_config().is_err());
    }

    #[test]
    fn test_dev_platform_falls_back_to_dev_secret() {
        let args = parse(&["--platform", "dev", "--jwt-secret", ""]);
        assert_eq!(args.jwt_secret().as_deref(), Some(DEV_JWT_SECRET));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_auth_config_from_args() {
        let args = parse(&[
            "--jwt-secret",
            "my-secret-key",
            "--polka-key",
            "polka",
            "--access-token-ttl-seconds",
            "120",
            "--refresh-token-ttl-days",
            "7",
        ]);
        let config = args.auth_config().unwrap();
        assert_eq!(config.jwt_secret(), "my-secret-key");
        assert_eq!(config.api_key_secret(), "polka");
        assert_eq!(config.access_token_ttl_seconds(), 120);
        assert_eq!(config.refresh_token_ttl(), chrono::Duration::days(7));
    }

    #[test]
    fn test_update_user_flags_are_optional() {
        let args = Args::try_parse_from([
            "chirpy-auth",
            "update-user",
            "Bearer abc",
            "--password",
            "654321",
        ])
        .unwrap();

        match args.command {
            Command::UpdateUser {
                authorization,
                email,
                password,
            } => {
                assert_eq!(authorization, "Bearer abc");
                assert_eq!(email, None);
                assert_eq!(password.as_deref(), Some("654321"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let args = parse(&["--jwt-secret", "s", "--access-token-ttl-seconds", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(AuthConfig::new("").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AuthConfig::new("super-secret-value")
            .unwrap()
            .with_api_key_secret("polka-secret-value");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret-value"));
        assert!(!printed.contains("polka-secret-value"));
        assert!(printed.contains("<redacted>"));
    }
}
