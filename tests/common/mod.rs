#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;
use tweetbook::{
    ServerConfig, create_app_with_rate_limit,
    db::Database,
    jwt::{AccessClaims, JwtConfig},
    rate_limit::RateLimitConfig,
};

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const STRONG_PASSWORD: &str = "Secr3t!";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

/// App with a 5 minute token lifetime and no rate limiting.
pub async fn setup() -> TestApp {
    TestSetup::new().build().await
}

/// Builder for test setup with various options
pub struct TestSetup {
    lifetime: Duration,
    rate_limit: Option<RateLimitConfig>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            lifetime: Duration::from_secs(300),
            rate_limit: None,
        }
    }

    /// Access tokens expire as soon as they are issued, so they can be
    /// refreshed right away.
    pub fn with_expired_tokens(mut self) -> Self {
        self.lifetime = Duration::ZERO;
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let jwt = JwtConfig::new(TEST_SECRET, self.lifetime).expect("Invalid JWT config");

        let config = ServerConfig {
            db: db.clone(),
            jwt: jwt.clone(),
            min_password_length: 6,
            rate_limit: self.rate_limit.is_some(),
            trust_proxy: self.rate_limit.as_ref().is_some_and(|c| c.trust_proxy),
        };
        let app = create_app_with_rate_limit(&config, self.rate_limit.map(Arc::new));

        TestApp { app, db, jwt }
    }
}

impl TestApp {
    /// POST a JSON body and return the status and parsed JSON response.
    pub async fn post(&self, uri: &str, body: Value, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/v1/identity/register",
            serde_json::json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/v1/identity/login",
            serde_json::json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    pub async fn refresh(&self, token: &str, refresh_token: &str) -> (StatusCode, Value) {
        self.post(
            "/api/v1/identity/refresh",
            serde_json::json!({ "token": token, "refreshToken": refresh_token }),
            None,
        )
        .await
    }

    /// Register a user and return (access token, refresh token).
    pub async fn register_ok(&self, email: &str) -> (String, String) {
        let (status, body) = self.register(email, STRONG_PASSWORD).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        tokens(&body)
    }
}

/// Extract (token, refreshToken) from a success response.
pub fn tokens(body: &Value) -> (String, String) {
    assert_eq!(body["success"], true, "not a success response: {body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

/// The single error message of a failure response.
pub fn error_message(body: &Value) -> &str {
    assert_eq!(body["success"], false, "not a failure response: {body}");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1, "expected one error: {body}");
    errors[0].as_str().unwrap()
}

/// Re-sign an access token with its expiry moved into the past,
/// keeping the same jti and claims.
pub fn expire_token(jwt: &JwtConfig, token: &str) -> String {
    let mut claims: AccessClaims = jwt.validate_access_token(token).unwrap();
    let now = chrono::Utc::now().timestamp();
    claims.iat = now - 120;
    claims.nbf = now - 120;
    claims.exp = now - 60;
    sign(&claims)
}

/// Sign arbitrary claims with the test secret (HS256).
pub fn sign(claims: &AccessClaims) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET),
    )
    .unwrap()
}
