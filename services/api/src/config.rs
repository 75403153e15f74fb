//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use veridant_core::TransitionPolicy;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the admin account created at startup if it does not exist.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub public_base_url: String,
    pub pdf_font_dir: PathBuf,
    pub pdf_font_family: String,
    pub transition_policy: TransitionPolicy,
    pub session_ttl_days: i64,
    pub cors_origin: String,
    pub admin: Option<AdminBootstrap>,
    pub email_from: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            database_max_connections: 5,
            log_level: Level::INFO,
            public_base_url: "http://localhost:3000".to_string(),
            pdf_font_dir: PathBuf::from("./fonts"),
            pdf_font_family: "LiberationSans".to_string(),
            transition_policy: TransitionPolicy::Strict,
            session_ttl_days: 30,
            cors_origin: "http://localhost:3000".to_string(),
            admin: None,
            email_from: "no-reply@veridantai.com".to_string(),
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
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
        let defaults = Config::default();

        // --- Load Server and Database Settings ---
        let bind_address = parsed("BIND_ADDRESS", defaults.bind_address)?;
        let database_url = var("DATABASE_URL");
        let database_max_connections =
            parsed("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Document Settings ---
        let public_base_url = var("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_base_url);
        let pdf_font_dir = var("PDF_FONT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.pdf_font_dir);
        let pdf_font_family = var("PDF_FONT_FAMILY").unwrap_or(defaults.pdf_font_family);

        // --- Load Workflow and Auth Settings ---
        let transition_policy = if parsed("STRICT_STATUS_TRANSITIONS", true)? {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        };
        let session_ttl_days = parsed("SESSION_TTL_DAYS", defaults.session_ttl_days)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be a positive number of days".to_string(),
            ));
        }
        let cors_origin = var("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingVar("ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingVar("ADMIN_EMAIL".to_string())),
        };
        let email_from = var("EMAIL_FROM").unwrap_or(defaults.email_from);

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            public_base_url,
            pdf_font_dir,
            pdf_font_family,
            transition_policy,
            session_ttl_days,
            cors_origin,
            admin,
            email_from,
        })
    }
}
