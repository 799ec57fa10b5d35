//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPPY_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `SHOPIFY_STORE_NAME` - Store name or `*.myshopify.com` domain
//! - `SHOPIFY_STOREFRONT_TOKEN` - Storefront API access token
//! - `SENSAY_API_KEY` - Organization secret for the conversational AI API
//! - `SENSAY_REPLICA_UUID` - Replica that answers shopper messages
//!
//! ## Optional
//! - `SHOPPY_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPPY_PORT` - Listen port (default: 3000)
//! - `SHOPPY_ENVIRONMENT` - `production` or `development` (default: production)
//! - `SHOPPY_ALLOWED_ORIGINS` - Comma-separated CORS origins
//! - `SHOPIFY_API_VERSION` - API version (default: 2024-07)
//! - `SHOPIFY_ADMIN_TOKEN` - Admin API token, enables order status lookups
//! - `SENSAY_API_URL` - API base URL (default: <https://api.sensay.io>)
//! - `SENSAY_API_VERSION` - `X-API-Version` header (default: 2025-03-25)
//! - `SENSAY_ORG_ID` - Organization ID, logged for diagnostics
//! - `UPSTREAM_MAX_RETRIES` - Retries for transient upstream failures (default: 2)
//! - `UPSTREAM_RETRY_BASE_MS` - First backoff delay in ms (default: 200)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::retry::RetryConfig;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Whether internal error details may be returned to clients.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("expected production or development, got {other}")),
        }
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// JWT signing secret
    pub jwt_secret: SecretString,
    /// Shopify API configuration
    pub shopify: ShopifyConfig,
    /// Conversational AI configuration
    pub sensay: SensayConfig,
    /// Backoff policy for upstream calls
    pub retry: RetryConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Error event sample rate
    pub sentry_sample_rate: f32,
    /// Performance trace sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Shopify API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Store name (`my-store`) or full domain (`my-store.myshopify.com`)
    pub store_name: String,
    /// Shopify API version (e.g., 2024-07)
    pub api_version: String,
    /// Storefront API access token
    pub storefront_token: SecretString,
    /// Admin API access token
    pub admin_token: Option<SecretString>,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store_name", &self.store_name)
            .field("api_version", &self.api_version)
            .field("storefront_token", &"[REDACTED]")
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_name: get_required_env("SHOPIFY_STORE_NAME")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2024-07"),
            storefront_token: get_validated_secret("SHOPIFY_STOREFRONT_TOKEN")?,
            admin_token: get_optional_env("SHOPIFY_ADMIN_TOKEN").map(SecretString::from),
        })
    }

    /// The `*.myshopify.com` domain of the store.
    #[must_use]
    pub fn store_domain(&self) -> String {
        let name = self.store_name.trim();
        if name.ends_with(".myshopify.com") {
            name.to_string()
        } else {
            format!("{name}.myshopify.com")
        }
    }

    /// Storefront GraphQL endpoint.
    #[must_use]
    pub fn storefront_endpoint(&self) -> String {
        format!(
            "https://{}/api/{}/graphql.json",
            self.store_domain(),
            self.api_version
        )
    }

    /// Admin GraphQL endpoint.
    #[must_use]
    pub fn admin_endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.store_domain(),
            self.api_version
        )
    }
}

/// Conversational AI configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct SensayConfig {
    /// API base URL without the version segment
    pub api_url: String,
    /// Value of the `X-API-Version` header
    pub api_version: String,
    /// Organization secret
    pub api_key: SecretString,
    /// Replica answering shopper messages
    pub replica_uuid: String,
    /// Organization ID
    pub org_id: Option<String>,
}

impl std::fmt::Debug for SensayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensayConfig")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("api_key", &"[REDACTED]")
            .field("replica_uuid", &self.replica_uuid)
            .field("org_id", &self.org_id)
            .finish()
    }
}

impl SensayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_base_url("SENSAY_API_URL", "https://api.sensay.io")?,
            api_version: get_env_or_default("SENSAY_API_VERSION", "2025-03-25"),
            api_key: get_validated_secret("SENSAY_API_KEY")?,
            replica_uuid: get_required_env("SENSAY_REPLICA_UUID")?,
            org_id: get_optional_env("SENSAY_ORG_ID"),
        })
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOPPY_DATABASE_URL")?;
        let host = parse_env("SHOPPY_HOST", "127.0.0.1")?;
        let port = parse_env("SHOPPY_PORT", "3000")?;
        let environment = parse_env("SHOPPY_ENVIRONMENT", "production")?;
        let allowed_origins = parse_origins(&get_env_or_default(
            "SHOPPY_ALLOWED_ORIGINS",
            DEFAULT_ALLOWED_ORIGINS,
        ));

        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;

        let retry = RetryConfig {
            max_retries: parse_env("UPSTREAM_MAX_RETRIES", "2")?,
            base_delay: Duration::from_millis(parse_env("UPSTREAM_RETRY_BASE_MS", "200")?),
            ..RetryConfig::default()
        };

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            allowed_origins,
            jwt_secret,
            shopify: ShopifyConfig::from_env()?,
            sensay: SensayConfig::from_env()?,
            retry,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
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

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

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

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
/// Parse an `http(s)` base URL, returned without a trailing slash.
fn parse_base_url(key: &str, default: &str) -> Result<String, ConfigError> {
    let raw = get_env_or_default(key, default);
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
