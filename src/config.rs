//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//! The database path is the one required setting; it may also be passed as the
//! first command-line argument, which takes precedence:
//!
//! ```bash
//! geoip_enrich /usr/share/GeoIP/GeoLite2-City.mmdb
//! ```
//!
//! # Enrichment
//!
//! - `GEOIP_DATABASE_PATH`: MaxMind City database (`.mmdb`)
//! - `GEOIP_FORWARDED_HEADER`: Header carrying the forwarded-for chain (default: `X-Forwarded-For`)
//! - `GEOIP_RESPONSE_HEADERS`: Also copy `X-GeoIP-*` fields to responses (default: false)
//! - `TRUSTED_PROXIES`: CIDR ranges allowed to supply the forwarded-for chain
//!
//! # Observability
//!
//! - `RUST_LOG`: Log filter (default: `info`)
//! - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
//! - `METRICS_PORT`: Prometheus exporter port (default: 9090, 0 = disabled)

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderName;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};
use crate::geoip::fields;
use crate::middleware::X_FORWARDED_FOR;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for local development
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'pretty' or 'json', got {other:?}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::load(std::env::args().nth(1))?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Enrichment Configuration
    // =========================================================================
    /// Path to the MaxMind City database. Required.
    pub database_path: PathBuf,

    /// Header holding the forwarded-for chain (default: x-forwarded-for)
    pub forwarded_header: HeaderName,

    /// Copy the enrichment fields to response headers as well (default: false)
    pub response_headers: bool,

    /// Trusted proxy CIDR ranges.
    /// The forwarded-for chain is only honored if the connection
    /// originates from one of these networks.
    ///
    /// Format: Comma-separated CIDR notation (e.g., "10.0.0.0/8,172.16.0.0/12")
    /// Default: Empty (trust all sources - NOT recommended for production)
    pub trusted_proxies: Vec<String>,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Comma-separated list of allowed CORS origins
    /// Use "*" to allow all origins (not recommended for production)
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Log output format (default: pretty)
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables, letting
    /// `database_arg` (the first command-line argument) override
    /// `GEOIP_DATABASE_PATH`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value is malformed or the
    /// database path is missing.
    pub fn load(database_arg: Option<String>) -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_path = database_arg
            .filter(|arg| !arg.trim().is_empty())
            .or_else(|| env::var("GEOIP_DATABASE_PATH").ok())
            .unwrap_or_default();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Enrichment
            database_path: PathBuf::from(database_path.trim()),
            forwarded_header: Self::parse_env(
                "GEOIP_FORWARDED_HEADER",
                HeaderName::from_static(X_FORWARDED_FOR),
            )?,
            response_headers: Self::parse_env("GEOIP_RESPONSE_HEADERS", false)?,
            trusted_proxies: split_list(&env::var("TRUSTED_PROXIES").unwrap_or_default()),

            // Security
            cors_allowed_origins: split_list(
                &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),

            // Observability
            log_level: env::var("RUST_LOG")
                .ok()
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| "info".to_string()),
            log_format: Self::parse_env("LOG_FORMAT", LogFormat::Pretty)?,
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(AppError::ConfigError(
                "GEOIP_DATABASE_PATH is required (or pass the database path as the first argument)"
                    .to_string(),
            ));
        }

        // The middleware strips these before reading the chain
        if fields::ALL.contains(&self.forwarded_header.as_str()) {
            return Err(AppError::ConfigError(format!(
                "GEOIP_FORWARDED_HEADER cannot be an enrichment header ({})",
                self.forwarded_header
            )));
        }

        EnvFilter::try_new(&self.log_level)
            .map_err(|e| AppError::ConfigError(format!("Invalid RUST_LOG: {e}")))?;

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if trusted proxy validation is enabled.
    ///
    /// When enabled, the forwarded-for chain is only trusted if the request
    /// originates from a configured trusted proxy network.
    pub fn proxy_validation_enabled(&self) -> bool {
        !self.trusted_proxies.is_empty()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        if self.metrics_enabled() {
            Some(SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }
}

/// Split a comma-separated list, dropping blank entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// The database path is empty, so `validate()` fails until one is set.
/// Production deployments should use `Config::load()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Enrichment
            database_path: PathBuf::new(),
            forwarded_header: HeaderName::from_static(X_FORWARDED_FOR),
            response_headers: false,
            trusted_proxies: vec![], // Empty = trust all (dev mode)
            // Security
            cors_allowed_origins: vec!["*".to_string()],
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9090,
        }
    }
}
