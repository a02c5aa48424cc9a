//! Identity error taxonomy.

use super::store::StoreError;
use crate::jwt::JwtError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User with this email address already exists")]
    UserAlreadyExists,

    #[error("User does not exist")]
    UserNotFound,

    #[error("User/password combination is wrong")]
    InvalidCredentials,

    #[error("{0}")]
    WeakPassword(&'static str),

    #[error("Invalid token")]
    InvalidToken,

    #[error("This token hasn't expired yet")]
    TokenNotExpired,

    #[error("This refresh token does not exist")]
    RefreshTokenNotFound,

    #[error("This refresh token has expired")]
    RefreshTokenExpired,

    #[error("This refresh token has been invalidated")]
    RefreshTokenInvalidated,

    #[error("This refresh token has been used")]
    RefreshTokenAlreadyUsed,

    #[error("This refresh token does not match this JWT")]
    RefreshTokenJwtMismatch,

    #[error("Identity store unavailable")]
    StoreUnavailable(#[from] StoreError),

    #[error("Failed to issue token")]
    TokenIssuance(#[source] JwtError),
}

impl AuthError {
    /// Whether this error signals infrastructure trouble rather than a client mistake.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_) | AuthError::TokenIssuance(_))
    }
}
