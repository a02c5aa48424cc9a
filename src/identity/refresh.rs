//! Refresh exchange: trade an expired access token plus an unused refresh
//! token for a new pair.

use chrono::Utc;
use tracing::warn;

use super::error::AuthError;
use super::issuer::TokenIssuer;
use super::model::AuthTokens;
use super::store::{CredentialStore, RefreshTokenStore};
use crate::jwt::JwtConfig;

pub struct RefreshExchange<'a, C, R> {
    jwt: &'a JwtConfig,
    credentials: &'a C,
    refresh_tokens: &'a R,
}

impl<'a, C: CredentialStore, R: RefreshTokenStore> RefreshExchange<'a, C, R> {
    pub fn new(jwt: &'a JwtConfig, credentials: &'a C, refresh_tokens: &'a R) -> Self {
        Self {
            jwt,
            credentials,
            refresh_tokens,
        }
    }

    /// Validate both tokens and, if everything checks out, consume the
    /// refresh token and issue a new pair.
    ///
    /// Nothing is written before every check has passed, and the only write
    /// is the store's `rotate`, which consumes the old token and stores the
    /// new one together. Of two concurrent redemptions of the same token
    /// exactly one succeeds; on any error the old token stays usable.
    pub async fn redeem(&self, token: &str, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = self
            .jwt
            .validate_expired_access_token(token)
            .map_err(|_| AuthError::InvalidToken)?;

        let now = Utc::now();

        // The access token must already be expired
        if claims.exp > now.timestamp() {
            return Err(AuthError::TokenNotExpired);
        }

        let stored = self
            .refresh_tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        if stored.expiry_date <= now {
            return Err(AuthError::RefreshTokenExpired);
        }

        if stored.invalidated {
            return Err(AuthError::RefreshTokenInvalidated);
        }

        if stored.used {
            warn!(user_id = %stored.user_id, "Refresh token replayed");
            return Err(AuthError::RefreshTokenAlreadyUsed);
        }

        if stored.jwt_id != claims.jti {
            return Err(AuthError::RefreshTokenJwtMismatch);
        }

        let user = self
            .credentials
            .find_by_id(&claims.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let user_claims = self.credentials.get_claims(&user.id).await?;

        let pair = TokenIssuer::new(self.jwt, self.refresh_tokens).prepare(&user, &user_claims)?;

        if !self.refresh_tokens.rotate(refresh_token, &pair.refresh).await? {
            // Lost a race against another redemption or an invalidation
            let current = self.refresh_tokens.find_by_token(refresh_token).await?;
            return Err(match current {
                Some(t) if t.invalidated => AuthError::RefreshTokenInvalidated,
                _ => {
                    warn!(user_id = %stored.user_id, "Concurrent refresh token redemption");
                    AuthError::RefreshTokenAlreadyUsed
                }
            });
        }

        Ok(pair.finish())
    }
}
