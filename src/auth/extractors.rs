//! Axum extractors for authentication.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::bearer::get_bearer_token;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::claims::Policy;

/// Validate the bearer token of a request.
fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend,
{
    let token = get_bearer_token(&parts.headers).ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state.jwt().validate_access_token(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthErrorKind::InvalidToken
    })?;

    Ok(AuthenticatedUser { claims })
}

/// Extractor for endpoints that require a valid, unexpired access token.
/// Stateless: only the signature and expiry are checked.
pub struct Bearer(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Bearer
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .map(Bearer)
            .map_err(ApiAuthError::new)
    }
}

/// Compile-time selection of the policy an [`Authorized`] extractor enforces.
pub trait PolicyConstraint: Send + Sync {
    const POLICY: Policy;
}

/// Requires the `tags.view` claim.
pub struct TagViewer;

impl PolicyConstraint for TagViewer {
    const POLICY: Policy = Policy::TagViewer;
}

/// Extractor that authenticates the bearer token and then checks a policy
/// against the token's claims. Fails with 401 or 403 respectively.
pub struct Authorized<P: PolicyConstraint> {
    pub user: AuthenticatedUser,
    policy: PhantomData<P>,
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: HasAuthBackend + Send + Sync,
    P: PolicyConstraint,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate_request(parts, state).map_err(ApiAuthError::new)?;

        if !P::POLICY.is_satisfied_by(&user.claims.extra) {
            debug!(user_id = %user.user_id(), policy = ?P::POLICY, "Policy not satisfied");
            return Err(ApiAuthError::new(AuthErrorKind::InsufficientClaims));
        }

        Ok(Authorized {
            user,
            policy: PhantomData,
        })
    }
}
