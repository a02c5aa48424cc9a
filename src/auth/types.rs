//! Authentication user types.

use crate::jwt::AccessClaims;

/// Authenticated user information extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Claims from the validated access token
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> &str {
        &self.claims.id
    }
}
