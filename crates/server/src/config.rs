//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TERRITORY_DATABASE_URL` - `MySQL` connection string (falls back to `DATABASE_URL`)
//! - `BASE_URL` - Public URL of the frontend, used in email links
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `TERRITORY_HOST` - Bind address (default: 127.0.0.1)
//! - `TERRITORY_PORT` - Listen port (default: 3000)
//! - `JWT_EXPIRES_IN` - Lifetime of emailed tokens (default: 1h, at most 365d)
//! - `SESSION_MAX_AGE_DAYS` - Session and cookie lifetime, 1 to 365 (default: 30)
//! - `COOKIE_SECURE` - Mark the session cookie `Secure` (default: `BASE_URL` is https)
//! - `FRONTEND_ORIGIN` - Origin allowed by CORS with credentials
//! - `PASSWORD_RESET_TTL_MINUTES` - Reset link lifetime, 1 to 1440 (default: 60)
//! - `SWEEP_INTERVAL_SECONDS` - Expired row cleanup period (default: 3600)
//! - `RATE_LIMIT_ENABLED` - Rate limit `/api/auth` (default: true)
//! - `MAX_IMAGE_BYTES` - Upload limit for territory images (default: 5 MiB)
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   outgoing mail; without `SMTP_HOST` emails are only logged
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Longest accepted `JWT_EXPIRES_IN`.
const MAX_TOKEN_TTL_DAYS: i64 = 365;
/// Accepted `SESSION_MAX_AGE_DAYS`.
const SESSION_MAX_AGE_DAYS: RangeInclusive<u32> = 1..=365;
/// Accepted `PASSWORD_RESET_TTL_MINUTES`.
const PASSWORD_RESET_TTL_MINUTES: RangeInclusive<u32> = 1..=24 * 60;

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

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, for terminals.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `MySQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the frontend (no trailing slash)
    pub base_url: String,
    /// Token signing settings
    pub jwt: JwtConfig,
    /// Session cookie settings
    pub session: SessionConfig,
    /// Origin allowed to call the API with credentials
    pub frontend_origin: Option<String>,
    /// How long a password reset link stays valid
    pub password_reset_ttl: TimeDelta,
    /// Period of the expired session / token sweep
    pub sweep_interval: std::time::Duration,
    /// Whether auth endpoints are rate limited
    pub rate_limit_enabled: bool,
    /// Maximum accepted image upload size
    pub max_image_bytes: usize,
    /// Log output format
    pub log_format: LogFormat,
    /// Outgoing mail; `None` logs emails instead of sending them
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// JWT signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret
    pub secret: SecretString,
    /// Default lifetime of emailed tokens
    pub expires_in: TimeDelta,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Lifetime of a session and its cookie, in days
    pub max_age_days: u32,
    /// Whether the cookie carries the `Secure` attribute
    pub cookie_secure: bool,
}

impl SessionConfig {
    /// Session lifetime as a duration.
    #[must_use]
    pub fn max_age(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.max_age_days))
    }
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
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

        let database_url = get_database_url("TERRITORY_DATABASE_URL")?;
        let host = parse_env_or_default("TERRITORY_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("TERRITORY_PORT", "3000")?;

        let base_url = get_required_env("BASE_URL")?;
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BASE_URL".to_string(), e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;
        let expires_in = parse_duration(&get_env_or_default("JWT_EXPIRES_IN", "1h"))
            .map_err(|e| ConfigError::InvalidEnvVar("JWT_EXPIRES_IN".to_string(), e))?;

        let cookie_secure = match get_optional_env("COOKIE_SECURE") {
            Some(value) => parse_bool(&value)
                .map_err(|e| ConfigError::InvalidEnvVar("COOKIE_SECURE".to_string(), e))?,
            None => parsed.scheme() == "https",
        };
        let max_age_days = check_range(
            "SESSION_MAX_AGE_DAYS",
            parse_env_or_default("SESSION_MAX_AGE_DAYS", "30")?,
            &SESSION_MAX_AGE_DAYS,
        )?;
        let reset_minutes = check_range(
            "PASSWORD_RESET_TTL_MINUTES",
            parse_env_or_default("PASSWORD_RESET_TTL_MINUTES", "60")?,
            &PASSWORD_RESET_TTL_MINUTES,
        )?;
        let sweep_seconds: u64 = parse_env_or_default("SWEEP_INTERVAL_SECONDS", "3600")?;
        let rate_limit_enabled = parse_bool(&get_env_or_default("RATE_LIMIT_ENABLED", "true"))
            .map_err(|e| ConfigError::InvalidEnvVar("RATE_LIMIT_ENABLED".to_string(), e))?;
        let log_format = get_env_or_default("LOG_FORMAT", "pretty")
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar("LOG_FORMAT".to_string(), e))?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in,
            },
            session: SessionConfig {
                max_age_days,
                cookie_secure,
            },
            frontend_origin: get_optional_env("FRONTEND_ORIGIN"),
            password_reset_ttl: TimeDelta::minutes(i64::from(reset_minutes)),
            sweep_interval: std::time::Duration::from_secs(sweep_seconds.max(1)),
            rate_limit_enabled,
            max_image_bytes: parse_env_or_default("MAX_IMAGE_BYTES", "5242880")?,
            log_format,
            email: EmailConfig::from_env()?,
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

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env_or_default("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a duration written as `<n>s`, `<n>m`, `<n>h` or `<n>d`.
///
/// A bare number is read as seconds. At most a year is accepted.
///
/// # Errors
///
/// Returns a message if the number or unit is not understood, or the
/// duration is out of range.
pub fn parse_duration(value: &str) -> Result<TimeDelta, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: i64 = digits
        .parse()
        .map_err(|_| format!("invalid duration `{value}`"))?;
    if amount <= 0 {
        return Err(format!("duration `{value}` must be positive"));
    }

    let duration = match unit.trim() {
        "" | "s" => TimeDelta::try_seconds(amount),
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        "d" => TimeDelta::try_days(amount),
        other => return Err(format!("unknown duration unit `{other}`")),
    };

    duration
        .filter(|d| *d <= TimeDelta::days(MAX_TOKEN_TTL_DAYS))
        .ok_or_else(|| format!("duration `{value}` exceeds {MAX_TOKEN_TTL_DAYS} days"))
}

/// Reject a numeric setting outside `range`.
fn check_range(
    key: &str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<u32, ConfigError> {
    if range.contains(&value) {
        return Ok(value);
    }
    Err(ConfigError::InvalidEnvVar(
        key.to_string(),
        format!(
            "must be between {} and {} (got {value})",
            range.start(),
            range.end()
        ),
    ))
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got `{other}`")),
    }
}

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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
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
    let len = s.chars().count() as f64;
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

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
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
