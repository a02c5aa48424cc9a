//! Identity domain types.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Months, Utc};

/// Refresh tokens stay redeemable for six months.
pub const REFRESH_TOKEN_LIFETIME_MONTHS: u32 = 6;

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

/// A persisted refresh token record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    /// Opaque token value handed to the client
    pub token: String,
    /// JTI of the access token this was minted alongside
    pub jwt_id: String,
    pub user_id: String,
    pub creation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub used: bool,
    pub invalidated: bool,
}

impl RefreshToken {
    /// Create a fresh, unused refresh token bound to an access token JTI.
    pub fn new(jwt_id: &str, user_id: &str, now: DateTime<Utc>) -> Self {
        let expiry_date = now
            .checked_add_months(Months::new(REFRESH_TOKEN_LIFETIME_MONTHS))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            token: generate_token_value(),
            jwt_id: jwt_id.to_string(),
            user_id: user_id.to_string(),
            creation_date: now,
            expiry_date,
            used: false,
            invalidated: false,
        }
    }
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub token: String,
    pub refresh_token: String,
}

/// Generate a random opaque token value (32 bytes, base64url, no padding).
fn generate_token_value() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
