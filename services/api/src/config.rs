//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::Duration;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs the service on in-memory stores.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub development: bool,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub ai_base_url: String,
    pub ai_timeout: std::time::Duration,
    pub ai_health_check: bool,
    pub ai_health_timeout: std::time::Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub frontend_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let development = std::env::var("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        // --- Load Token Settings ---
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        let jwt_expires_in_str =
            std::env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "7d".to_string());
        let jwt_expires_in = parse_duration(&jwt_expires_in_str).ok_or_else(|| {
            ConfigError::InvalidValue(
                "JWT_EXPIRES_IN".to_string(),
                format!("'{}' is not a duration like 7d, 12h, 30m or 3600s", jwt_expires_in_str),
            )
        })?;

        // --- Load Summarization Service Settings ---
        let ai_base_url = std::env::var("AI_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        let ai_timeout = std::time::Duration::from_secs(parse_var("AI_TIMEOUT_SECS", 120)?);
        let ai_health_check = parse_var("AI_HEALTH_CHECK", true)?;
        let ai_health_timeout =
            std::time::Duration::from_secs(parse_var("AI_HEALTH_TIMEOUT_SECS", 5)?);

        // --- Load Upload Settings ---
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads/documents"));
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            development,
            jwt_secret,
            jwt_expires_in,
            ai_base_url,
            ai_timeout,
            ai_health_check,
            ai_health_timeout,
            upload_dir,
            max_upload_bytes,
            frontend_url,
        })
    }
}

/// Reads `name` and parses it, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' could not be parsed", raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Parses durations such as `7d`, `12h`, `30m`, `45s` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }
    match unit {
        "" | "s" => Some(Duration::seconds(amount)),
        "m" => Some(Duration::minutes(amount)),
        "h" => Some(Duration::hours(amount)),
        "d" => Some(Duration::days(amount)),
        _ => None,
    }
}
