//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup, validated, and turned into the
//! immutable runtime objects shared through [`AppState`](crate::state::AppState).
//!
//! ## Required Variables
//!
//! - `TOKEN_SIGNING_SECRET` - HMAC key for bearer tokens, non-empty
//!
//! ## Optional Variables
//!
//! - `DATABASE_URL` - SQLite database (default: `sqlite://resource-api.db`)
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `TOKEN_LIFETIME_DAYS` - Bearer token lifetime (default: 14)
//! - `DEBUG` - Expose unexpected-error detail to clients (default: `false`)
//! - `DEFAULT_PAGE_LIMIT` - Page size when `limit` is omitted (default: 30)
//! - `DB_MAX_CONNECTIONS`, `DB_CONNECT_TIMEOUT`, `DB_IDLE_TIMEOUT`,
//!   `DB_MAX_LIFETIME` - pool settings

use anyhow::{Context, Result};
use std::env;

use crate::application::services::TokenService;
use crate::state::ApiSettings;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://resource-api.db";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// HMAC key for bearer tokens (`TOKEN_SIGNING_SECRET`).
    pub token_signing_secret: String,
    pub token_lifetime_days: i64,
    pub debug: bool,
    pub default_page_limit: u32,

    // ── Pool settings ───────────────────────────────────────────────────────
    /// Maximum number of connections in the pool (`DB_MAX_CONNECTIONS`, default: 10).
    pub db_max_connections: u32,
    /// Timeout for acquiring a connection in seconds (`DB_CONNECT_TIMEOUT`, default: 30).
    pub db_connect_timeout: u64,
    /// Idle connection lifetime in seconds (`DB_IDLE_TIMEOUT`, default: 600).
    pub db_idle_timeout: u64,
    /// Maximum connection lifetime in seconds (`DB_MAX_LIFETIME`, default: 1800).
    pub db_max_lifetime: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TOKEN_SIGNING_SECRET` is missing.
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let token_signing_secret =
            env::var("TOKEN_SIGNING_SECRET").context("TOKEN_SIGNING_SECRET must be set")?;

        let token_lifetime_days = env::var("TOKEN_LIFETIME_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(14);

        let debug = env::var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let default_page_limit = env::var("DEFAULT_PAGE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let db_connect_timeout = env::var("DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let db_idle_timeout = env::var("DB_IDLE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600);

        let db_max_lifetime = env::var("DB_MAX_LIFETIME")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800);

        Ok(Self {
            database_url,
            listen_addr,
            log_level,
            log_format,
            token_signing_secret,
            token_lifetime_days,
            debug,
            default_page_limit,
            db_max_connections,
            db_connect_timeout,
            db_idle_timeout,
            db_max_lifetime,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `log_format` is not `text` or `json`
    /// - `listen_addr` is not `host:port`
    /// - `database_url` is not a SQLite URL
    /// - the signing secret is empty or the token lifetime is outside 1..=3650 days
    /// - a pool setting is zero
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!(
                "DATABASE_URL must start with 'sqlite:', got '{}'",
                self.database_url
            );
        }

        if self.token_signing_secret.is_empty() {
            anyhow::bail!("TOKEN_SIGNING_SECRET must not be empty");
        }

        if !(1..=3650).contains(&self.token_lifetime_days) {
            anyhow::bail!(
                "TOKEN_LIFETIME_DAYS must be between 1 and 3650, got {}",
                self.token_lifetime_days
            );
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.db_connect_timeout == 0 {
            anyhow::bail!("DB_CONNECT_TIMEOUT must be greater than 0");
        }

        Ok(())
    }

    /// Builds the token service from the signing secret and lifetime.
    pub fn token_service(&self) -> Result<TokenService> {
        TokenService::new(
            self.token_signing_secret.as_bytes(),
            chrono::Duration::days(self.token_lifetime_days),
        )
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            debug: self.debug,
            default_limit: self.default_page_limit,
        }
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Database: {}", self.database_url);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Token lifetime: {} days", self.token_lifetime_days);
        tracing::info!("  Default page limit: {}", self.default_page_limit);
        if self.debug {
            tracing::warn!("  Debug mode: error details are exposed to clients");
        }
    }
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if required variables are missing or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            listen_addr: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            token_signing_secret: "test-secret".to_string(),
            token_lifetime_days: 14,
            debug: false,
            default_page_limit: 30,
            db_max_connections: 10,
            db_connect_timeout: 30,
            db_idle_timeout: 600,
            db_max_lifetime: 1800,
        }
    }

    #[test]
    fn test_config_validation() {
        let mut config = config();
        assert!(config.validate().is_ok());

        config.log_format = "invalid".to_string();
        assert!(config.validate().is_err());
        config.log_format = "json".to_string();
        assert!(config.validate().is_ok());

        config.listen_addr = "3000".to_string();
        assert!(config.validate().is_err());
        config.listen_addr = "0.0.0.0:3000".to_string();

        config.database_url = "postgres://localhost/test".to_string();
        assert!(config.validate().is_err());
        config.database_url = DEFAULT_DATABASE_URL.to_string();

        config.token_lifetime_days = 0;
        assert!(config.validate().is_err());
        config.token_lifetime_days = 3651;
        assert!(config.validate().is_err());
        config.token_lifetime_days = 14;

        config.token_signing_secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_runtime_objects() {
        let config = config();
        assert_eq!(
            config.token_service().unwrap().lifetime(),
            chrono::Duration::days(14)
        );
        let settings = config.api_settings();
        assert!(!settings.debug);
        assert_eq!(settings.default_limit, 30);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            env::set_var("TOKEN_SIGNING_SECRET", "from-env");
            env::remove_var("DATABASE_URL");
            env::remove_var("DEBUG");
            env::remove_var("TOKEN_LIFETIME_DAYS");
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.token_signing_secret, "from-env");
        assert_eq!(config.token_lifetime_days, 14);
        assert!(!config.debug);

        unsafe {
            env::remove_var("TOKEN_SIGNING_SECRET");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("TOKEN_SIGNING_SECRET", "s");
            env::set_var("DEBUG", "TRUE");
            env::set_var("TOKEN_LIFETIME_DAYS", "7");
            env::set_var("DEFAULT_PAGE_LIMIT", "5");
        }

        let config = Config::from_env().unwrap();

        assert!(config.debug);
        assert_eq!(config.token_lifetime_days, 7);
        assert_eq!(config.default_page_limit, 5);

        unsafe {
            env::remove_var("TOKEN_SIGNING_SECRET");
            env::remove_var("DEBUG");
            env::remove_var("TOKEN_LIFETIME_DAYS");
            env::remove_var("DEFAULT_PAGE_LIMIT");
        }
    }

    #[test]
    #[serial]
    fn test_missing_secret_is_error() {
        // SAFETY: Tests are run serially
        unsafe {
            env::remove_var("TOKEN_SIGNING_SECRET");
        }
        assert!(Config::from_env().is_err());
    }
}
