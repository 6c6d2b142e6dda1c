//! Login, refresh and revoke flows
//!
//! - login: password check, then an access token and a persisted refresh token
//! - refresh: bearer refresh token, then a new access token
//! - revoke: bearer refresh token, then revocation
//! - update_credentials: bearer access token, then a new email and/or password
//!
//! Password hashing runs on the blocking pool. If the caller goes away the
//! hash still completes and its result is dropped; nothing is written before
//! a flow has fully succeeded.

use std::fmt;
use std::sync::Arc;

use hyper::HeaderMap;
use tracing::{info, warn};

use crate::auth::credentials::{api_key_matches, get_api_key, get_bearer_token};
use crate::auth::gate::AuthorizationGate;
use crate::auth::jwt::AccessTokenIssuer;
use crate::auth::password::{Argon2Hasher, PasswordAlgorithm, DUMMY_HASH};
use crate::auth::refresh::RefreshTokenManager;
use crate::config::AuthConfig;
use crate::db::{AuthStore, NewUser, User};
use crate::types::{AuthError, ChirpyError, Result};

/// Tokens handed out on a successful login
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("user", &self.user.id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

pub struct SessionService<S: AuthStore> {
    store: Arc<S>,
    hasher: Arc<dyn PasswordAlgorithm>,
    access_tokens: AccessTokenIssuer,
    gate: AuthorizationGate,
    refresh_tokens: RefreshTokenManager<S>,
    api_key_secret: String,
    access_token_ttl_seconds: i64,
}

impl<S: AuthStore> SessionService<S> {
    /// Create a service using Argon2id password hashing
    pub fn new(config: &AuthConfig, store: Arc<S>) -> Self {
        Self::with_hasher(config, store, Arc::new(Argon2Hasher::new()))
    }

    pub fn with_hasher(
        config: &AuthConfig,
        store: Arc<S>,
        hasher: Arc<dyn PasswordAlgorithm>,
    ) -> Self {
        let access_tokens = AccessTokenIssuer::hs256(config.jwt_secret());

        Self {
            refresh_tokens: RefreshTokenManager::new(store.clone(), config.refresh_token_ttl()),
            gate: AuthorizationGate::new(access_tokens.clone()),
            access_tokens,
            store,
            hasher,
            api_key_secret: config.api_key_secret().to_string(),
            access_token_ttl_seconds: config.access_token_ttl_seconds(),
        }
    }

    pub fn access_tokens(&self) -> &AccessTokenIssuer {
        &self.access_tokens
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenManager<S> {
        &self.refresh_tokens
    }

    /// Create a user with a hashed password
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        if email.is_empty() {
            return Err(ChirpyError::BadRequest("Email is required".into()));
        }
        if password.is_empty() {
            return Err(ChirpyError::BadRequest("Password is required".into()));
        }

        let hashed_password = self.hash_blocking(password).await?;
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                hashed_password,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Verify credentials and issue an access token plus a refresh token
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            // Same hashing cost as a wrong password
            self.verify_blocking(password, DUMMY_HASH).await?;
            warn!("Login failed - unknown email");
            return Err(AuthError::PasswordMismatch.into());
        };

        if !self.verify_blocking(password, &user.hashed_password).await? {
            warn!(user_id = %user.id, "Login failed - invalid password");
            return Err(AuthError::PasswordMismatch.into());
        }

        let access_token = self
            .access_tokens
            .issue(&user.id, self.access_token_ttl_seconds)?;
        let refresh_token = self.refresh_tokens.issue_for(&user.id).await?;

        info!(user_id = %user.id, "Login successful");
        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Exchange the bearer refresh token for a new access token
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String> {
        let token = get_bearer_token(headers)?;
        let user_id = self.refresh_tokens.validate(token).await?;

        let access_token = self
            .access_tokens
            .issue(&user_id, self.access_token_ttl_seconds)?;
        info!(user_id = %user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the bearer refresh token
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<()> {
        let token = get_bearer_token(headers)?;
        self.refresh_tokens.revoke(token).await
    }

    /// Change the calling user's email and/or password
    ///
    /// Empty fields count as absent. Refresh tokens already issued stay valid.
    pub async fn update_credentials(
        &self,
        headers: &HeaderMap,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User> {
        let user_id = self.gate.authorize(headers)?;

        let email = email.filter(|email| !email.is_empty());
        let password = password.filter(|password| !password.is_empty());
        if email.is_none() && password.is_none() {
            return Err(ChirpyError::BadRequest(
                "At least one field (email or password) is required".into(),
            ));
        }

        let hashed_password = match password {
            Some(password) => Some(self.hash_blocking(password).await?),
            None => None,
        };

        let user = self
            .store
            .update_user(&user_id, email.map(str::to_string), hashed_password)
            .await?
            .ok_or_else(|| ChirpyError::Internal(format!("User {} not found for update", user_id)))?;

        info!(
            user_id = %user.id,
            email_changed = email.is_some(),
            password_changed = password.is_some(),
            "User credentials updated"
        );
        Ok(user)
    }

    /// Resolve the calling user from a bearer access token
    pub fn authorize(&self, headers: &HeaderMap) -> std::result::Result<String, AuthError> {
        self.gate.authorize(headers)
    }

    /// Check the `ApiKey` header against the configured operator key
    pub fn check_api_key(&self, headers: &HeaderMap) -> std::result::Result<(), AuthError> {
        let key = get_api_key(headers)?;
        if api_key_matches(key, &self.api_key_secret) {
            Ok(())
        } else {
            warn!("Rejected request with invalid API key");
            Err(AuthError::InvalidApiKey)
        }
    }

    async fn hash_blocking(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use hyper::header::{HeaderValue, AUTHORIZATION};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reversible stand-in so flow tests don't pay for Argon2
    struct ReversingHasher;

    impl PasswordAlgorithm for ReversingHasher {
        fn hash(&self, password: &str) -> Result<String> {
            Ok(format!("rev${}", password.chars().rev().collect::<String>()))
        }

        fn verify(&self, password: &str, hash: &str) -> bool {
            self.hash(password).map(|h| h == hash).unwrap_or(false)
        }
    }

    /// Counts verifications, delegating to the reversing stand-in
    #[derive(Default)]
    struct CountingHasher {
        verifies: AtomicUsize,
    }

    impl PasswordAlgorithm for CountingHasher {
        fn hash(&self, password: &str) -> Result<String> {
            ReversingHasher.hash(password)
        }

        fn verify(&self, password: &str, hash: &str) -> bool {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            ReversingHasher.verify(password, hash)
        }
    }

    fn service() -> SessionService<MemoryStore> {
        let config = AuthConfig::new("my-secret-key")
            .unwrap()
            .with_api_key_secret("f271c81ff7084ee5b99a5091b42d486e");
        SessionService::with_hasher(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(ReversingHasher),
        )
    }

    fn header(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn auth_kind<T>(result: Result<T>) -> Option<AuthError> {
        result.err().and_then(|e| e.auth_kind())
    }

    #[tokio::test]
    async fn test_login_issues_token_pair() {
        let service = service();
        let user = service.register("walt@breakingbad.com", "123456").await.unwrap();

        let outcome = service.login("walt@breakingbad.com", "123456").await.unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert_eq!(outcome.refresh_token.len(), 64);
        assert_eq!(
            service.authorize(&header(&format!("Bearer {}", outcome.access_token))),
            Ok(user.id.clone())
        );
        assert_eq!(
            service.refresh_tokens().validate(&outcome.refresh_token).await.unwrap(),
            user.id
        );
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = service();
        service.register("walt@breakingbad.com", "123456").await.unwrap();

        assert_eq!(
            auth_kind(service.login("walt@breakingbad.com", "wrong").await),
            Some(AuthError::PasswordMismatch)
        );
        assert_eq!(
            auth_kind(service.login("nobody@example.com", "123456").await),
            Some(AuthError::PasswordMismatch)
        );
    }

    #[tokio::test]
    async fn test_unknown_email_pays_for_a_verification() {
        let hasher = Arc::new(CountingHasher::default());
        let service = SessionService::with_hasher(
            &AuthConfig::new("my-secret-key").unwrap(),
            Arc::new(MemoryStore::new()),
            hasher.clone(),
        );
        service.register("walt@breakingbad.com", "123456").await.unwrap();

        assert!(service.login("nobody@example.com", "123456").await.is_err());
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 1);

        assert!(service.login("walt@breakingbad.com", "wrong").await.is_err());
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 2);
    }

    async fn login_bearer(
        service: &SessionService<MemoryStore>,
        email: &str,
        password: &str,
    ) -> HeaderMap {
        let outcome = service.login(email, password).await.unwrap();
        header(&format!("Bearer {}", outcome.access_token))
    }

    #[tokio::test]
    async fn test_update_password_replaces_login_secret() {
        let service = service();
        let user = service.register("walt@breakingbad.com", "123456").await.unwrap();
        let bearer = login_bearer(&service, "walt@breakingbad.com", "123456").await;

        let updated = service
            .update_credentials(&bearer, None, Some("654321"))
            .await
            .unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.email, "walt@breakingbad.com");

        assert_eq!(
            auth_kind(service.login("walt@breakingbad.com", "123456").await),
            Some(AuthError::PasswordMismatch)
        );
        assert!(service.login("walt@breakingbad.com", "654321").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_email_moves_login() {
        let service = service();
        service.register("walt@breakingbad.com", "123456").await.unwrap();
        let bearer = login_bearer(&service, "walt@breakingbad.com", "123456").await;

        service
            .update_credentials(&bearer, Some("heisenberg@breakingbad.com"), Some(""))
            .await
            .unwrap();

        assert_eq!(
            auth_kind(service.login("walt@breakingbad.com", "123456").await),
            Some(AuthError::PasswordMismatch)
        );
        assert!(service.login("heisenberg@breakingbad.com", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let service = service();
        service.register("walt@breakingbad.com", "123456").await.unwrap();
        let bearer = login_bearer(&service, "walt@breakingbad.com", "123456").await;

        for (email, password) in [(None, None), (Some(""), Some(""))] {
            assert!(matches!(
                service.update_credentials(&bearer, email, password).await,
                Err(ChirpyError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_update_requires_access_token() {
        let service = service();
        service.register("walt@breakingbad.com", "123456").await.unwrap();
        let outcome = service.login("walt@breakingbad.com", "123456").await.unwrap();

        assert_eq!(
            auth_kind(
                service
                    .update_credentials(&HeaderMap::new(), None, Some("654321"))
                    .await
            ),
            Some(AuthError::MissingCredential)
        );
        assert_eq!(
            auth_kind(
                service
                    .update_credentials(
                        &header(&format!("Bearer {}", outcome.refresh_token)),
                        None,
                        Some("654321"),
                    )
                    .await
            ),
            Some(AuthError::MalformedToken)
        );
        assert!(service.login("walt@breakingbad.com", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn test_register_requires_fields() {
        let service = service();
        assert!(matches!(
            service.register("", "pw").await,
            Err(ChirpyError::BadRequest(_))
        ));
        assert!(matches!(
            service.register("a@example.com", "").await,
            Err(ChirpyError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_then_revoke() {
        let service = service();
        service.register("walt@breakingbad.com", "123456").await.unwrap();
        let outcome = service.login("walt@breakingbad.com", "123456").await.unwrap();
        let refresh_header = header(&format!("Bearer {}", outcome.refresh_token));

        let access = service.refresh(&refresh_header).await.unwrap();
        assert_eq!(
            service.access_tokens().validate(&access),
            Ok(outcome.user.id.clone())
        );

        service.revoke(&refresh_header).await.unwrap();
        assert_eq!(
            auth_kind(service.refresh(&refresh_header).await),
            Some(AuthError::TokenNotActive)
        );
    }

    #[tokio::test]
    async fn test_refresh_requires_bearer_header() {
        let service = service();
        assert_eq!(
            auth_kind(service.refresh(&HeaderMap::new()).await),
            Some(AuthError::MissingCredential)
        );
        assert_eq!(
            auth_kind(service.revoke(&header("Basic abc")).await),
            Some(AuthError::MalformedCredential)
        );
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let service = service();
        service.register("walt@breakingbad.com", "123456").await.unwrap();
        let outcome = service.login("walt@breakingbad.com", "123456").await.unwrap();

        assert_eq!(
            auth_kind(
                service
                    .refresh(&header(&format!("Bearer {}", outcome.access_token)))
                    .await
            ),
            Some(AuthError::TokenNotActive)
        );
    }

    #[test]
    fn test_api_key_check() {
        let service = service();
        assert_eq!(
            service.check_api_key(&header("ApiKey f271c81ff7084ee5b99a5091b42d486e")),
            Ok(())
        );
        assert_eq!(
            service.check_api_key(&header("ApiKey nope")),
            Err(AuthError::InvalidApiKey)
        );
        assert_eq!(
            service.check_api_key(&header("Bearer f271c81ff7084ee5b99a5091b42d486e")),
            Err(AuthError::MalformedCredential)
        );
    }

    #[test]
    fn test_unconfigured_api_key_rejects_everything() {
        let config = AuthConfig::new("my-secret-key").unwrap();
        let service = SessionService::new(&config, Arc::new(MemoryStore::new()));
        assert_eq!(
            service.check_api_key(&header("ApiKey anything")),
            Err(AuthError::InvalidApiKey)
        );
    }

    #[test]
    fn test_outcome_debug_redacts_tokens() {
        let now = chrono::Utc::now();
        let outcome = LoginOutcome {
            user: User {
                id: "u1".into(),
                email: "a@example.com".into(),
                hashed_password: "h".into(),
                is_chirpy_red: false,
                created_at: now,
                updated_at: now,
            },
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
        };
        let printed = format!("{:?}", outcome);
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
    }
}
