//! Slack-related errors.
//!
//! The split mirrors how each failure is handled: signature failures reject
//! the request as unauthenticated, payload and metadata failures reject it as
//! a protocol error, and `SlackError` (outbound delivery) is logged and
//! swallowed by the notifier.

use thiserror::Error;

/// Errors that can occur when calling the Slack Web API.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed.
    #[error("Slack request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Slack API returned an error.
    #[error("Slack API error: {0}")]
    Api(String),
}

/// Reasons a webhook request fails authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// A signature or timestamp header is absent or empty.
    #[error("missing {0} header")]
    MissingField(&'static str),

    /// The timestamp header is not an integer.
    #[error("malformed request timestamp: {0}")]
    MalformedTimestamp(String),

    /// The timestamp is outside the replay window.
    #[error("request timestamp is {age_secs}s away from now (limit {tolerance_secs}s)")]
    StaleRequest {
        /// Absolute distance between the request timestamp and now.
        age_secs: u64,
        /// Configured replay window.
        tolerance_secs: u64,
    },

    /// The signature does not match the body.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The signing secret cannot key an HMAC.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Errors decoding a webhook body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Body is not a form, lacks the `payload` field, or holds invalid JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The JSON envelope has no string `type` field.
    #[error("interaction payload has no type field")]
    MissingTypeField,

    /// The JSON envelope has a type this service does not handle.
    #[error("unsupported interaction type: {0}")]
    UnsupportedType(String),
}

/// Errors decoding the correlation state carried in `private_metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The metadata is empty, malformed, or does not match the schema exactly.
    #[error("invalid interaction metadata: {0}")]
    InvalidState(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_error_display() {
        let err = SignatureError::StaleRequest {
            age_secs: 600,
            tolerance_secs: 300,
        };
        assert_eq!(
            err.to_string(),
            "request timestamp is 600s away from now (limit 300s)"
        );
        assert_eq!(
            SignatureError::MissingField("X-Slack-Signature").to_string(),
            "missing X-Slack-Signature header"
        );
    }

    #[test]
    fn test_payload_error_display() {
        assert_eq!(
            PayloadError::UnsupportedType("shortcut".into()).to_string(),
            "unsupported interaction type: shortcut"
        );
    }
}
