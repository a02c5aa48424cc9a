//! Identity API endpoints.
//!
//! - POST `/register` - Create an account and issue a token pair
//! - POST `/login` - Check credentials and issue a token pair
//! - POST `/refresh` - Exchange an expired access token and its refresh token
//! - POST `/logout` - Invalidate every outstanding refresh token of the caller

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::Identity;
use super::error::{ApiError, validate_email};
use crate::auth::{Bearer, HasAuthBackend};
use crate::identity::AuthTokens;
use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

#[derive(Clone)]
pub struct IdentityState {
    pub identity: Arc<Identity>,
    pub rate_limit: Option<Arc<RateLimitConfig>>,
}

impl HasAuthBackend for IdentityState {
    fn jwt(&self) -> &JwtConfig {
        self.identity.jwt()
    }
}

pub fn router(state: IdentityState) -> Router {
    let mut register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone());
    let mut login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone());

    if let Some(config) = state.rate_limit.clone() {
        register_router = register_router.layer(middleware::from_fn_with_state(
            config.clone(),
            rate_limit_register,
        ));
        login_router =
            login_router.layer(middleware::from_fn_with_state(config, rate_limit_login));
    }

    let rest = Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state);

    Router::new()
        .merge(register_router)
        .merge(login_router)
        .merge(rest)
}

#[derive(Deserialize)]
struct CredentialsRequest {
    email: String,
    password: String,
}

impl CredentialsRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_email(self.email.trim())?;
        if self.password.is_empty() {
            return Err(ApiError::bad_request("Password cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthSuccessResponse {
    success: bool,
    token: String,
    refresh_token: String,
}

impl From<AuthTokens> for AuthSuccessResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            success: true,
            token: tokens.token,
            refresh_token: tokens.refresh_token,
        }
    }
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
    invalidated: u64,
}

async fn register(
    State(state): State<IdentityState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let tokens = state
        .identity
        .register(payload.email.trim(), &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthSuccessResponse::from(tokens))))
}

async fn login(
    State(state): State<IdentityState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let tokens = state
        .identity
        .login(payload.email.trim(), &payload.password)
        .await?;

    Ok(Json(AuthSuccessResponse::from(tokens)))
}

async fn refresh(
    State(state): State<IdentityState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let tokens = state
        .identity
        .refresh_token(&payload.token, &payload.refresh_token)
        .await?;

    Ok(Json(AuthSuccessResponse::from(tokens)))
}

async fn logout(
    State(state): State<IdentityState>,
    Bearer(user): Bearer,
) -> Result<impl IntoResponse, ApiError> {
    let invalidated = state.identity.logout(user.user_id()).await?;

    Ok(Json(LogoutResponse {
        success: true,
        invalidated,
    }))
}
