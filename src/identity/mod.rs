//! Identity core: registration, login and the refresh-token lifecycle.
//!
//! Access tokens are short-lived, stateless HS256 JWTs. Each one is minted
//! alongside a persisted refresh token bound to its `jti`; a refresh token
//! can be redeemed exactly once, and only together with its (expired)
//! access token.

mod error;
mod issuer;
mod model;
mod refresh;
mod service;
mod store;
#[cfg(test)]
mod testing;

pub use error::AuthError;
pub use issuer::{PendingPair, TokenIssuer};
pub use model::{AuthTokens, REFRESH_TOKEN_LIFETIME_MONTHS, RefreshToken, User};
pub use refresh::RefreshExchange;
pub use service::IdentityService;
pub use store::{CredentialStore, RefreshTokenStore, StoreError};
