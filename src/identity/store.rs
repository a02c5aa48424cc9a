//! Storage traits the identity core depends on.
//!
//! The SQLite implementations live in [`crate::db`]; anything else that
//! satisfies these traits (an in-memory map in tests, another database)
//! can back the same service logic.

use std::future::Future;

use super::model::{RefreshToken, User};
use crate::claims::UserClaim;

/// Failure of the underlying persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing error: {0}")]
    Hashing(String),
}

pub trait CredentialStore: Send + Sync {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn find_by_id(&self, id: &str) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Create a user with a hashed password and its initial claims, all or
    /// nothing. Returns `None` if the email is already registered.
    fn create_user(
        &self,
        email: &str,
        password: &str,
        claims: &[UserClaim],
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn check_password(
        &self,
        user: &User,
        password: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn get_claims(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<UserClaim>, StoreError>> + Send;

    /// Attach a claim to a user, replacing any existing value for the same key.
    fn add_claim(
        &self,
        user_id: &str,
        claim: &UserClaim,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub trait RefreshTokenStore: Send + Sync {
    fn add(&self, token: &RefreshToken) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn find_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<RefreshToken>, StoreError>> + Send;

    /// Overwrite the mutable fields of a stored record. Returns false if absent.
    fn update(&self, token: &RefreshToken)
    -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Consume `token` and store `replacement` as one atomic step.
    ///
    /// `used` flips from false to true only on a token that is neither used
    /// nor invalidated, and only if the replacement is stored as well.
    /// Returns false, with nothing written, if another caller won or the
    /// token was invalidated in the meantime.
    fn rotate(
        &self,
        token: &str,
        replacement: &RefreshToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Invalidate every unused refresh token of a user. Returns the count.
    fn invalidate_for_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
