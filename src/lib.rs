pub mod api;
pub mod auth;
pub mod claims;
pub mod cli;
pub mod db;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Prefix every API route is mounted under.
pub const API_PATH: &str = "/api/v1";

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing keys and access token lifetime
    pub jwt: JwtConfig,
    /// Minimum password length for new accounts
    pub min_password_length: usize,
    /// Whether register and login are rate limited per IP
    pub rate_limit: bool,
    /// Take the client IP from X-Forwarded-For
    pub trust_proxy: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let rate_limit = config
        .rate_limit
        .then(|| Arc::new(RateLimitConfig::new(config.trust_proxy)));

    create_app_with_rate_limit(config, rate_limit)
}

/// Create the application router with explicit rate limiters.
/// `None` disables rate limiting regardless of `config.rate_limit`.
pub fn create_app_with_rate_limit(
    config: &ServerConfig,
    rate_limit: Option<Arc<RateLimitConfig>>,
) -> Router {
    let api_router = create_api_router(
        config.db.clone(),
        Arc::new(config.jwt.clone()),
        config.min_password_length,
        rate_limit,
    );

    Router::new().nest(API_PATH, api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
