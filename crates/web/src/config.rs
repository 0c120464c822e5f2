//! Web server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SNIPPETBOX_DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `SNIPPETBOX_HOST` - Bind address (default: 127.0.0.1)
//! - `SNIPPETBOX_PORT` - Listen port (default: 4000)
//! - `SNIPPETBOX_BASE_URL` - Public URL (default: `http://localhost:4000`)
//! - `SNIPPETBOX_SESSION_COOKIE` - Session cookie name (default: `session_id`)
//! - `SNIPPETBOX_SESSION_LIFETIME_HOURS` - Sliding session lifetime (default: 12)
//! - `SNIPPETBOX_CSRF_FIELD` - Hidden form field carrying the CSRF token (default: `csrf_token`)
//! - `SNIPPETBOX_STATIC_DIR` - Directory served under `/static` (default: `crates/web/static`)
//! - `SNIPPETBOX_LOG_FORMAT` - `text` or `json` (default: `text`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_SESSION_LIFETIME_HOURS: u32 = 12;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, one line per event.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,
    /// Sliding lifetime, refreshed on every touched request.
    pub lifetime_hours: u32,
    /// Whether the cookie is restricted to HTTPS.
    pub secure: bool,
}

/// Web server configuration.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Session cookie settings
    pub session: SessionConfig,
    /// Name of the form field carrying the CSRF token
    pub csrf_field: String,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SNIPPETBOX_DATABASE_URL")?;
        let host = parse_env("SNIPPETBOX_HOST", "127.0.0.1")?;
        let port = parse_env("SNIPPETBOX_PORT", "4000")?;
        let base_url = get_env_or_default("SNIPPETBOX_BASE_URL", "http://localhost:4000");
        validate_base_url(&base_url)?;

        let lifetime_hours: u32 = parse_env(
            "SNIPPETBOX_SESSION_LIFETIME_HOURS",
            &DEFAULT_SESSION_LIFETIME_HOURS.to_string(),
        )?;
        if lifetime_hours == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SNIPPETBOX_SESSION_LIFETIME_HOURS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let session = SessionConfig {
            cookie_name: get_non_empty_env("SNIPPETBOX_SESSION_COOKIE", "session_id")?,
            lifetime_hours,
            secure: base_url.starts_with("https://"),
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session,
            csrf_field: get_non_empty_env("SNIPPETBOX_CSRF_FIELD", "csrf_token")?,
            static_dir: PathBuf::from(get_env_or_default(
                "SNIPPETBOX_STATIC_DIR",
                "crates/web/static",
            )),
            log_format: parse_env("SNIPPETBOX_LOG_FORMAT", "text")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Defaults suitable for local development and tests.
    ///
    /// Uses a plain-HTTP base URL, so the session cookie is not `Secure`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/snippetbox"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 4000,
            base_url: "http://localhost:4000".to_string(),
            session: SessionConfig {
                cookie_name: "session_id".to_string(),
                lifetime_hours: DEFAULT_SESSION_LIFETIME_HOURS,
                secure: false,
            },
            csrf_field: "csrf_token".to_string(),
            static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable that must not be blank when set.
fn get_non_empty_env(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be empty".to_string(),
        ));
    }
    Ok(value)
}

/// Parse an environment variable, falling back to a default.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(base_url).map_err(|e| {
        ConfigError::InvalidEnvVar("SNIPPETBOX_BASE_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SNIPPETBOX_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("http://localhost:4000").is_ok());
        assert!(validate_base_url("https://snippetbox.example.org").is_ok());
        assert!(validate_base_url("ftp://example.org").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn test_development_defaults() {
        let config = WebConfig::development();
        assert_eq!(config.session.cookie_name, "session_id");
        assert_eq!(config.session.lifetime_hours, 12);
        assert!(!config.session.secure);
        assert_eq!(config.csrf_field, "csrf_token");
    }

    #[test]
    fn test_socket_addr() {
        let config = WebConfig::development();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_database_url_is_redacted_in_debug() {
        let mut config = WebConfig::development();
        config.database_url = SecretString::from("postgres://user:hunter2@db/snippetbox");
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
