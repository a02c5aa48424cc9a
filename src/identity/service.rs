//! Identity service: register, login, refresh and logout orchestration.

use std::sync::Arc;

use tracing::info;

use super::error::AuthError;
use super::issuer::TokenIssuer;
use super::model::AuthTokens;
use super::refresh::RefreshExchange;
use super::store::{CredentialStore, RefreshTokenStore};
use crate::claims::default_claims;
use crate::jwt::JwtConfig;
use crate::password;

/// Authentication service.
///
/// Generic over the store implementations so the same logic runs against
/// SQLite in production and in-memory doubles in tests.
pub struct IdentityService<C, R> {
    credentials: C,
    refresh_tokens: R,
    jwt: Arc<JwtConfig>,
    min_password_length: usize,
}

impl<C: CredentialStore, R: RefreshTokenStore> IdentityService<C, R> {
    pub fn new(credentials: C, refresh_tokens: R, jwt: Arc<JwtConfig>) -> Self {
        Self {
            credentials,
            refresh_tokens,
            jwt,
            min_password_length: password::DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }

    pub fn with_min_password_length(mut self, min_password_length: usize) -> Self {
        self.min_password_length = min_password_length;
        self
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Register a new user, attach the default claims and issue tokens.
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        password::check_policy(password, self.min_password_length)
            .map_err(AuthError::WeakPassword)?;

        if self.credentials.find_by_email(email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        // A concurrent registration may still win the insert
        let claims = default_claims();
        let user = self
            .credentials
            .create_user(email, password, &claims)
            .await?
            .ok_or(AuthError::UserAlreadyExists)?;

        info!(user_id = %user.id, "User registered");

        self.issuer().issue(&user, &claims).await
    }

    /// Check credentials and issue tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        let user = self
            .credentials
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.credentials.check_password(&user, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let claims = self.credentials.get_claims(&user.id).await?;
        self.issuer().issue(&user, &claims).await
    }

    /// Exchange an expired access token and its refresh token for a new pair.
    pub async fn refresh_token(
        &self,
        token: &str,
        refresh_token: &str,
    ) -> Result<AuthTokens, AuthError> {
        RefreshExchange::new(&self.jwt, &self.credentials, &self.refresh_tokens)
            .redeem(token, refresh_token)
            .await
    }

    /// Invalidate every outstanding refresh token of a user.
    pub async fn logout(&self, user_id: &str) -> Result<u64, AuthError> {
        let count = self.refresh_tokens.invalidate_for_user(user_id).await?;
        info!(user_id = %user_id, count, "Refresh tokens invalidated");
        Ok(count)
    }

    fn issuer(&self) -> TokenIssuer<'_, R> {
        TokenIssuer::new(&self.jwt, &self.refresh_tokens)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::identity::testing::{MemoryCredentials, MemoryRefreshTokens, TEST_SECRET};

    fn service(lifetime: Duration) -> IdentityService<MemoryCredentials, MemoryRefreshTokens> {
        IdentityService::new(
            MemoryCredentials::default(),
            MemoryRefreshTokens::default(),
            Arc::new(JwtConfig::new(TEST_SECRET, lifetime).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_register_returns_tokens_with_default_claims() {
        let svc = service(Duration::from_secs(300));

        let tokens = svc.register("alice@example.com", "Secr3t!").await.unwrap();
        assert!(!tokens.token.is_empty());
        assert!(!tokens.refresh_token.is_empty());

        let claims = svc.jwt().validate_access_token(&tokens.token).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.claim("tags.view"), Some("true"));
    }

    #[tokio::test]
    async fn test_register_twice() {
        let svc = service(Duration::from_secs(300));

        svc.register("alice@example.com", "Secr3t!").await.unwrap();
        let result = svc.register("alice@example.com", "0ther!Pass").await;

        assert!(matches!(result, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_register_weak_password() {
        let svc = service(Duration::from_secs(300));

        let result = svc.register("alice@example.com", "secret").await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
        assert!(
            svc.credentials
                .find_by_email("alice@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_custom_min_password_length() {
        let svc = service(Duration::from_secs(300)).with_min_password_length(12);

        let result = svc.register("alice@example.com", "Secr3t!").await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_login() {
        let svc = service(Duration::from_secs(300));
        svc.register("alice@example.com", "Secr3t!").await.unwrap();

        let tokens = svc.login("alice@example.com", "Secr3t!").await.unwrap();
        let claims = svc.jwt().validate_access_token(&tokens.token).unwrap();
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.claim("tags.view"), Some("true"));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let svc = service(Duration::from_secs(300));
        let result = svc.login("bob@example.com", "Secr3t!").await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let svc = service(Duration::from_secs(300));
        svc.register("alice@example.com", "Secr3t!").await.unwrap();

        let result = svc.login("alice@example.com", "Wr0ng!!").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_right_after_register_is_too_early() {
        let svc = service(Duration::from_secs(300));
        let tokens = svc.register("alice@example.com", "Secr3t!").await.unwrap();

        let result = svc.refresh_token(&tokens.token, &tokens.refresh_token).await;
        assert!(matches!(result, Err(AuthError::TokenNotExpired)));
    }

    #[tokio::test]
    async fn test_refresh_chain() {
        let svc = service(Duration::ZERO);
        let first = svc.register("alice@example.com", "Secr3t!").await.unwrap();

        let second = svc
            .refresh_token(&first.token, &first.refresh_token)
            .await
            .unwrap();
        let third = svc
            .refresh_token(&second.token, &second.refresh_token)
            .await
            .unwrap();

        assert_ne!(second.refresh_token, third.refresh_token);
        let claims = svc.jwt().validate_expired_access_token(&third.token).unwrap();
        assert_eq!(claims.claim("tags.view"), Some("true"));
    }

    #[tokio::test]
    async fn test_logout_invalidates_refresh_tokens() {
        let svc = service(Duration::ZERO);
        let tokens = svc.register("alice@example.com", "Secr3t!").await.unwrap();
        let user_id = svc.jwt().validate_expired_access_token(&tokens.token).unwrap().id;

        assert_eq!(svc.logout(&user_id).await.unwrap(), 1);

        let result = svc.refresh_token(&tokens.token, &tokens.refresh_token).await;
        assert!(matches!(result, Err(AuthError::RefreshTokenInvalidated)));
    }

    #[tokio::test]
    async fn test_register_store_failure_creates_nothing() {
        let svc = service(Duration::from_secs(300));
        svc.credentials.fail_writes(true);

        let result = svc.register("alice@example.com", "Secr3t!").await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
        assert_eq!(svc.credentials.user_count(), 0);

        svc.credentials.fail_writes(false);
        svc.register("alice@example.com", "Secr3t!").await.unwrap();
    }

    #[tokio::test]
    async fn test_register_issuance_failure_leaves_complete_user() {
        let svc = service(Duration::from_secs(300));
        svc.refresh_tokens.fail_writes(true);

        let result = svc.register("alice@example.com", "Secr3t!").await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));

        // The account exists with its default claims, so login recovers
        svc.refresh_tokens.fail_writes(false);
        let tokens = svc.login("alice@example.com", "Secr3t!").await.unwrap();
        let claims = svc.jwt().validate_access_token(&tokens.token).unwrap();
        assert_eq!(claims.claim("tags.view"), Some("true"));
    }
}
