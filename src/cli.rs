//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{JwtConfig, MIN_SECRET_LENGTH};
use crate::password::DEFAULT_MIN_PASSWORD_LENGTH;
use clap::Parser;
use tracing::{error, info, warn};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Tweetbook",
    about = "Tweetbook identity API with JWT access tokens and rotating refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7292")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, default_value = "tweetbook.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "TOKEN_LIFETIME_SECS", default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub token_lifetime_secs: u64,

    /// Minimum password length for new accounts
    #[arg(long, default_value_t = DEFAULT_MIN_PASSWORD_LENGTH)]
    pub min_password_length: usize,

    /// Disable per-IP rate limiting of register and login
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Take the client IP from X-Forwarded-For (only behind a reverse proxy)
    #[arg(long)]
    pub trust_proxy: bool,

    /// Create a tag at startup if it does not exist yet (repeatable)
    #[arg(long = "tag", value_name = "NAME")]
    pub tags: Vec<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: called once during startup before any request handling,
        // and nothing else reads this variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if the signing configuration is rejected.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> Option<ServerConfig> {
    let lifetime = Duration::from_secs(args.token_lifetime_secs);

    let jwt = match JwtConfig::new(jwt_secret.as_bytes(), lifetime) {
        Ok(jwt) => jwt,
        Err(e) => {
            error!(error = %e, "Invalid JWT configuration");
            return None;
        }
    };

    if args.no_rate_limit {
        warn!("Rate limiting is disabled");
    }

    Some(ServerConfig {
        db,
        jwt,
        min_password_length: args.min_password_length,
        rate_limit: !args.no_rate_limit,
        trust_proxy: args.trust_proxy,
    })
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Create the tags named on the command line. Existing tags are left alone.
pub async fn seed_tags(db: &Database, names: &[String]) -> bool {
    let tags = db.tags();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            warn!("Skipping empty tag name");
            continue;
        }
        match tags.create(name, None).await {
            Ok(true) => info!(tag = %name, "Tag created"),
            Ok(false) => {}
            Err(e) => {
                error!(tag = %name, error = %e, "Failed to create tag");
                return false;
            }
        }
    }
    true
}
