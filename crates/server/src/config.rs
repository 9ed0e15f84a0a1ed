//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SLACK_BOT_TOKEN` - Slack bot token (xoxb-...)
//! - `SLACK_SIGNING_SECRET` - Slack app signing secret
//!
//! ## Optional
//! - `DATABASE_URL` - `PostgreSQL` connection string (absent: in-memory store)
//! - `LEAVEDESK_HOST` - Bind address (default: 127.0.0.1)
//! - `LEAVEDESK_PORT` - Listen port (default: 3000)
//! - `LEAVEDESK_API_TOKEN` - Bearer token enabling `/api/leaves` (min 32 chars, high entropy)
//! - `SLACK_TIMESTAMP_TOLERANCE_SECS` - Replay window for webhooks (default: 300)
//! - `DISPATCH_WORKERS` - Background worker count (default: 4)
//! - `DISPATCH_QUEUE_CAPACITY` - Background queue capacity (default: 256)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::dispatcher::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use crate::slack::DEFAULT_TOLERANCE;

const MIN_API_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token for the leave API; `None` disables `/api/leaves`
    pub api_token: Option<SecretString>,
    /// Slack credentials and webhook settings
    pub slack: SlackConfig,
    /// Background task pool sizing
    pub dispatch: DispatchConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Slack configuration.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct SlackConfig {
    /// Slack bot token (xoxb-...).
    pub bot_token: SecretString,
    /// Slack app signing secret for webhook verification.
    pub signing_secret: SecretString,
    /// Maximum age of a signed webhook request.
    pub timestamp_tolerance: Duration,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("timestamp_tolerance", &self.timestamp_tolerance)
            .finish()
    }
}

/// Background task pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// Maximum queued tasks before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env.optional("DATABASE_URL").map(SecretString::from);
        let host = env.parsed::<IpAddr>("LEAVEDESK_HOST", "127.0.0.1")?;
        let port = env.parsed::<u16>("LEAVEDESK_PORT", "3000")?;
        let api_token = env
            .optional("LEAVEDESK_API_TOKEN")
            .map(|token| {
                validate_api_token(&token, "LEAVEDESK_API_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(token))
            })
            .transpose()?;

        let slack = SlackConfig::from_env(&env)?;
        let dispatch = DispatchConfig {
            workers: env.parsed("DISPATCH_WORKERS", &DEFAULT_WORKERS.to_string())?,
            queue_capacity: env.parsed(
                "DISPATCH_QUEUE_CAPACITY",
                &DEFAULT_QUEUE_CAPACITY.to_string(),
            )?,
        };

        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            api_token,
            slack,
            dispatch,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SlackConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let bot_token = env.required("SLACK_BOT_TOKEN")?;
        let signing_secret = env.required("SLACK_SIGNING_SECRET")?;

        // Slack issues these, so weak values are reported but not fatal
        if let Err(e) = validate_secret_strength(&bot_token, "SLACK_BOT_TOKEN") {
            tracing::warn!("SLACK_BOT_TOKEN validation warning: {e}");
        }
        if let Err(e) = validate_secret_strength(&signing_secret, "SLACK_SIGNING_SECRET") {
            tracing::warn!("SLACK_SIGNING_SECRET validation warning: {e}");
        }

        let tolerance_secs = env.parsed(
            "SLACK_TIMESTAMP_TOLERANCE_SECS",
            &DEFAULT_TOLERANCE.as_secs().to_string(),
        )?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            signing_secret: SecretString::from(signing_secret),
            timestamp_tolerance: Duration::from_secs(tolerance_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source with the lookup helpers.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .unwrap_or_else(|| default.to_string())
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Validate that an API token is long, not a placeholder and random enough.
fn validate_api_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    if token.len() < MIN_API_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_API_TOKEN_LENGTH,
                token.len()
            ),
        ));
    }
    validate_secret_strength(token, var_name)
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

/// Returns true when `candidate` matches the configured API token.
///
/// Compares in constant time.
#[must_use]
pub fn api_token_matches(expected: &SecretString, candidate: &str) -> bool {
    let expected = expected.expose_secret().as_bytes();
    let candidate = candidate.as_bytes();
    if expected.len() != candidate.len() {
        return false;
    }
    expected
        .iter()
        .zip(candidate)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
