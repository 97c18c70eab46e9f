//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PLATFORM_DOMAIN` - Bare platform domain tenants live under (e.g. `shopkeep.in`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PLATFORM_ALIASES` - Comma-separated hosts served as the platform domain (default: localhost)
//! - `RESERVED_ROUTES` - Comma-separated top-level paths that are never store slugs
//! - `RESERVED_SUBDOMAINS` - Comma-separated platform subdomains that are never stores
//! - `TENANT_CACHE_TTL_SECS` - Tenant cache time-to-live (default: 60)
//! - `TENANT_CACHE_CAPACITY` - Tenant cache size (default: 10000)
//! - `ADMISSION_MAX_ATTEMPTS` - Ledger attempts per admission (default: 3)
//! - `ADMISSION_RETRY_BACKOFF_MS` - Base retry backoff (default: 25)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::quota::RetryPolicy;
use crate::tenant::DomainResolver;
use crate::tenant::resolver::{DEFAULT_RESERVED_ROUTES, DEFAULT_RESERVED_SUBDOMAINS};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Tenant resolution settings
    pub tenancy: TenancyConfig,
    /// Admission retry settings
    pub admission: AdmissionConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// How request hosts and paths map to tenants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyConfig {
    pub platform_domain: String,
    pub platform_aliases: Vec<String>,
    pub reserved_routes: Vec<String>,
    pub reserved_subdomains: Vec<String>,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

/// Bounded retry of transient ledger conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl StorefrontConfig {
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

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default("STOREFRONT_PORT", "3000")?;

        Ok(Self {
            database_url,
            host,
            port,
            tenancy: TenancyConfig::from_env()?,
            admission: AdmissionConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl TenancyConfig {
    /// Load tenancy settings on their own (used by the CLI, which has no server).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `PLATFORM_DOMAIN` is missing or a number is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let platform_domain = get_required_env("PLATFORM_DOMAIN")?;
        if platform_domain.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "PLATFORM_DOMAIN".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            platform_domain,
            platform_aliases: parse_list(&get_env_or_default("PLATFORM_ALIASES", "localhost")),
            reserved_routes: get_optional_env("RESERVED_ROUTES").map_or_else(
                || to_owned_list(DEFAULT_RESERVED_ROUTES),
                |raw| parse_list(&raw),
            ),
            reserved_subdomains: get_optional_env("RESERVED_SUBDOMAINS").map_or_else(
                || to_owned_list(DEFAULT_RESERVED_SUBDOMAINS),
                |raw| parse_list(&raw),
            ),
            cache_ttl: Duration::from_secs(get_parsed_or_default("TENANT_CACHE_TTL_SECS", "60")?),
            cache_capacity: get_parsed_or_default("TENANT_CACHE_CAPACITY", "10000")?,
        })
    }

    /// Build the domain resolver these settings describe.
    #[must_use]
    pub fn resolver(&self) -> DomainResolver {
        DomainResolver::new(&self.platform_domain)
            .with_aliases(&self.platform_aliases)
            .with_reserved_routes(&self.reserved_routes)
            .with_reserved_subdomains(&self.reserved_subdomains)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts(),
            retry_backoff: policy.base_backoff(),
        }
    }
}

impl AdmissionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts: u32 = get_parsed_or_default("ADMISSION_MAX_ATTEMPTS", "3")?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ADMISSION_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            retry_backoff: Duration::from_millis(get_parsed_or_default(
                "ADMISSION_RETRY_BACKOFF_MS",
                "25",
            )?),
        })
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_backoff)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` if neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., STOREFRONT_DATABASE_URL)
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
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable (or default) and parse it.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated list, dropping blanks and lower-casing entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
