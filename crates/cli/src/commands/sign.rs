//! Slack request signing for local webhook tests.
//!
//! # Usage
//!
//! ```bash
//! leavedesk-cli sign --body 'payload=...' --timestamp 1700000000
//! ```
//!
//! # Environment Variables
//!
//! - `SLACK_SIGNING_SECRET` - Secret shared with the running server

use leavedesk_server::slack::{
    SIGNATURE_HEADER, SignatureError, SignatureVerifier, TIMESTAMP_HEADER,
};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while signing.
#[derive(Debug, Error)]
pub enum SignError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The secret could not be used as an HMAC key.
    #[error("Signing failed: {0}")]
    Signature(#[from] SignatureError),
}

/// Sign `body` with `SLACK_SIGNING_SECRET`.
///
/// Returns the two header lines to send with the body.
///
/// # Errors
///
/// Returns `SignError` if the secret is unset or unusable.
pub fn sign_body(body: &str, timestamp: Option<i64>) -> Result<String, SignError> {
    dotenvy::dotenv().ok();

    let secret = std::env::var("SLACK_SIGNING_SECRET")
        .map(SecretString::from)
        .map_err(|_| SignError::MissingEnvVar("SLACK_SIGNING_SECRET"))?;

    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
    Ok(format_headers(&SignatureVerifier::new(secret), timestamp, body)?)
}

fn format_headers(
    verifier: &SignatureVerifier,
    timestamp: i64,
    body: &str,
) -> Result<String, SignatureError> {
    let timestamp = timestamp.to_string();
    let signature = verifier.sign(&timestamp, body.as_bytes())?;
    Ok(format!(
        "{TIMESTAMP_HEADER}: {timestamp}\n{SIGNATURE_HEADER}: {signature}"
    ))
}
