//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DELIVERY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `PIX_WEBHOOK_SECRET` - Shared secret for provider webhook signatures
//!
//! ## Required when `PIX_MODE=inter`
//! - `INTER_CLIENT_ID` - Banco Inter OAuth client ID
//! - `INTER_CLIENT_SECRET` - Banco Inter OAuth client secret
//! - `PIX_KEY` - PIX key that receives the charges
//! - `INTER_CERT_PATH` - PEM client certificate for the mutual-TLS handshake
//!
//! ## Optional when `PIX_MODE=inter`
//! - `INTER_KEY_PATH` - PEM private key, when not bundled in `INTER_CERT_PATH`
//!
//! ## Optional
//! - `DELIVERY_HOST` - Bind address (default: 127.0.0.1)
//! - `DELIVERY_PORT` - Listen port (default: 3000)
//! - `JWT_TTL_HOURS` - Access token lifetime (default: 24)
//! - `DRIVER_CLAIM_STATUS` - Status a driver claims from: `ready` or `paid` (default: ready)
//! - `PIX_MODE` - `sandbox` or `inter` (default: sandbox)
//! - `INTER_BASE_URL` - Banco Inter API base (default: <https://cdpj.partners.bancointer.com.br>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use ipobre_core::ClaimPolicy;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_INTER_BASE_URL: &str = "https://cdpj.partners.bancointer.com.br";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
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

/// Which PIX backend issues charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixMode {
    /// Deterministic local charges; enables the mock settlement route.
    Sandbox,
    /// Banco Inter PIX API.
    Inter,
}

impl std::str::FromStr for PixMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "inter" => Ok(Self::Inter),
            other => Err(format!("expected \"sandbox\" or \"inter\", got {other:?}")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Access token settings
    pub jwt: JwtConfig,
    /// Status drivers claim orders from
    pub claim_policy: ClaimPolicy,
    /// PIX provider settings
    pub pix: PixConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Access token settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    /// Token lifetime in hours
    pub ttl_hours: i64,
}

/// PIX provider settings.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PixConfig {
    /// Backend that issues charges
    pub mode: PixMode,
    /// Shared secret for webhook HMAC signatures
    pub webhook_secret: SecretString,
    /// Banco Inter credentials, present in `Inter` mode
    pub inter: Option<InterConfig>,
}

/// Banco Inter API credentials.
#[derive(Clone)]
pub struct InterConfig {
    /// API base URL
    pub base_url: Url,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// Receiving PIX key
    pub pix_key: String,
    /// Client certificate and private key, PEM encoded
    pub identity_pem: Option<SecretString>,
}

impl std::fmt::Debug for PixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixConfig")
            .field("mode", &self.mode)
            .field("webhook_secret", &"[REDACTED]")
            .field("inter", &self.inter)
            .finish()
    }
}

impl std::fmt::Debug for InterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterConfig")
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("pix_key", &self.pix_key)
            .field(
                "identity_pem",
                &self.identity_pem.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
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

        let database_url = get_database_url("DELIVERY_DATABASE_URL")?;
        let host = parse_env("DELIVERY_HOST", "127.0.0.1")?;
        let port = parse_env("DELIVERY_PORT", "3000")?;
        let jwt = JwtConfig::from_env()?;
        let claim_policy = parse_env("DRIVER_CLAIM_STATUS", "ready")?;
        let pix = PixConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            claim_policy,
            pix,
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

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&secret, "JWT_SECRET")?;
        let ttl_hours: i64 = parse_env("JWT_TTL_HOURS", "24")?;
        if ttl_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_TTL_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }
        Ok(Self { secret, ttl_hours })
    }
}

impl PixConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mode: PixMode = parse_env("PIX_MODE", "sandbox")?;
        let webhook_secret = get_validated_secret("PIX_WEBHOOK_SECRET")?;
        let inter = match mode {
            PixMode::Sandbox => None,
            PixMode::Inter => Some(InterConfig::from_env()?),
        };
        Ok(Self {
            mode,
            webhook_secret,
            inter,
        })
    }
}

impl InterConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = Url::parse(&get_env_or_default("INTER_BASE_URL", DEFAULT_INTER_BASE_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("INTER_BASE_URL".to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            client_id: get_required_env("INTER_CLIENT_ID")?,
            client_secret: get_validated_secret("INTER_CLIENT_SECRET")?,
            pix_key: get_required_env("PIX_KEY")?,
            identity_pem: Some(load_identity_pem(
                Path::new(&get_required_env("INTER_CERT_PATH")?),
                get_optional_env("INTER_KEY_PATH").as_deref().map(Path::new),
            )?),
        })
    }
}

/// Read the client certificate (and the key, if kept apart) into one PEM
/// bundle and check that it forms a usable TLS identity.
fn load_identity_pem(
    cert_path: &Path,
    key_path: Option<&Path>,
) -> Result<SecretString, ConfigError> {
    let read = |var: &str, path: &Path| {
        std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidEnvVar(var.to_string(), format!("{}: {e}", path.display()))
        })
    };

    let mut pem = read("INTER_CERT_PATH", cert_path)?;
    if let Some(key_path) = key_path {
        if !pem.ends_with('\n') {
            pem.push('\n');
        }
        pem.push_str(&read("INTER_KEY_PATH", key_path)?);
    }

    reqwest::Identity::from_pem(pem.as_bytes())
        .map_err(|e| ConfigError::InvalidEnvVar("INTER_CERT_PATH".to_string(), e.to_string()))?;
    Ok(SecretString::from(pem))
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

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
