//! Access/refresh token pair issuance.

use chrono::Utc;

use super::error::AuthError;
use super::model::{AuthTokens, RefreshToken, User};
use super::store::RefreshTokenStore;
use crate::claims::UserClaim;
use crate::jwt::JwtConfig;

/// Signs an access token and persists the companion refresh token.
pub struct TokenIssuer<'a, R> {
    jwt: &'a JwtConfig,
    refresh_tokens: &'a R,
}

impl<'a, R: RefreshTokenStore> TokenIssuer<'a, R> {
    pub fn new(jwt: &'a JwtConfig, refresh_tokens: &'a R) -> Self {
        Self {
            jwt,
            refresh_tokens,
        }
    }

    /// Issue a new token pair for a user.
    ///
    /// The refresh token is stored before anything is returned; a storage
    /// failure fails the whole issuance.
    pub async fn issue(&self, user: &User, claims: &[UserClaim]) -> Result<AuthTokens, AuthError> {
        let pair = self.prepare(user, claims)?;
        self.refresh_tokens.add(&pair.refresh).await?;
        Ok(pair.finish())
    }

    /// Sign the access token and build its refresh record without storing
    /// anything. The caller persists `refresh` and then calls `finish`.
    pub fn prepare(&self, user: &User, claims: &[UserClaim]) -> Result<PendingPair, AuthError> {
        let access = self
            .jwt
            .generate_access_token(&user.id, &user.email, claims)
            .map_err(AuthError::TokenIssuance)?;

        let refresh = RefreshToken::new(&access.jti, &user.id, Utc::now());

        Ok(PendingPair {
            token: access.token,
            refresh,
        })
    }
}

/// A signed access token whose refresh record is not yet persisted.
pub struct PendingPair {
    token: String,
    pub refresh: RefreshToken,
}

impl PendingPair {
    pub fn finish(self) -> AuthTokens {
        tracing::debug!(
            user_id = %self.refresh.user_id,
            jti = %self.refresh.jwt_id,
            "Issued token pair"
        );

        AuthTokens {
            token: self.token,
            refresh_token: self.refresh.token,
        }
    }
}
