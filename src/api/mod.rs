mod error;
mod identity;
mod tags;

use axum::Router;
use std::sync::Arc;

use crate::db::{Database, TokenStore, UserStore};
use crate::identity::IdentityService;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};
pub use identity::IdentityState;
pub use tags::TagsState;

/// The identity service as wired to SQLite.
pub type Identity = IdentityService<UserStore, TokenStore>;

/// Create the API router. Mount it under `/api/v1`.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    min_password_length: usize,
    rate_limit: Option<Arc<RateLimitConfig>>,
) -> Router {
    let identity = Arc::new(
        IdentityService::new(db.users(), db.tokens(), jwt.clone())
            .with_min_password_length(min_password_length),
    );

    let identity_state = IdentityState {
        identity,
        rate_limit,
    };

    let tags_state = TagsState { db, jwt };

    Router::new()
        .nest("/identity", identity::router(identity_state))
        .nest("/tags", tags::router(tags_state))
}
