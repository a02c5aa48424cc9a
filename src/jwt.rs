//! JWT access token generation and validation.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::claims::UserClaim;

/// Minimum signing secret length in bytes. HS256 needs a 256-bit key.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default access token lifetime: 5 minutes
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// JWT claims carried by every access token.
///
/// User claims are flattened into the top level of the payload as plain
/// string pairs, e.g. `"tags.view": "true"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user email)
    pub sub: String,
    /// JWT ID, binds the token to exactly one refresh token record
    pub jti: String,
    /// User email
    pub email: String,
    /// User ID
    pub id: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// User claims
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl AccessClaims {
    /// Look up a user claim by key.
    pub fn claim(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// Result of signing an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// JWT ID
    pub jti: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

/// Signing keys and token lifetime.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl JwtConfig {
    /// Create a new JWT configuration. Fails if the secret is too short for HS256.
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::SecretTooShort);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign an access token for a user.
    pub fn generate_access_token(
        &self,
        user_id: &str,
        email: &str,
        claims: &[UserClaim],
    ) -> Result<AccessTokenResult, JwtError> {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        let exp = now.saturating_add(lifetime);
        let jti = uuid::Uuid::new_v4().to_string();

        let extra = claims
            .iter()
            .map(|c| (c.kind.as_str().to_string(), c.value.clone()))
            .collect();

        let claims = AccessClaims {
            sub: email.to_string(),
            jti: jti.clone(),
            email: email.to_string(),
            id: user_id.to_string(),
            iat: now,
            nbf: now,
            exp,
            extra,
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            jti,
            expires_at: exp,
        })
    }

    /// Validate and decode an access token, including its expiry.
    /// Used for bearer authentication.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        self.decode(token, &validation)
    }

    /// Validate signature and structure while ignoring expiry.
    ///
    /// Used by the refresh exchange, where the access token is expected to
    /// have expired already. The header algorithm must still be HS256.
    pub fn validate_expired_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        self.decode(token, &validation)
    }

    fn decode(&self, token: &str, validation: &Validation) -> Result<AccessClaims, JwtError> {
        let token_data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::WrongAlgorithm,
                _ => JwtError::Decoding(e),
            })?;

        if token_data.header.alg != Algorithm::HS256 {
            return Err(JwtError::WrongAlgorithm);
        }

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret must be at least {MIN_SECRET_LENGTH} bytes")]
    SecretTooShort,
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Failed to decode token: {0}")]
    Decoding(jsonwebtoken::errors::Error),
    #[error("Token is not signed with HS256")]
    WrongAlgorithm,
}
