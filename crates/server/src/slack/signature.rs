//! Slack request signature verification.
//!
//! Implements Slack's signing scheme:
//! <https://api.slack.com/authentication/verifying-requests-from-slack>
//!
//! The HMAC is computed over the raw request bytes. Verifying after the body
//! has been parsed and re-encoded breaks the signature, so handlers take the
//! body as `Bytes` and verify before decoding anything.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use super::error::SignatureError;

/// Header carrying the `v0=<hex>` signature.
pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";
/// Header carrying the request's unix timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
/// Default replay window.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

const VERSION: &str = "v0";

/// Verifies inbound webhook signatures against the app's signing secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    signing_secret: SecretString,
    tolerance: Duration,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("signing_secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl SignatureVerifier {
    /// Create a verifier with the default 5 minute replay window.
    #[must_use]
    pub const fn new(signing_secret: SecretString) -> Self {
        Self {
            signing_secret,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Override the replay window.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify a request against the current wall clock.
    ///
    /// # Errors
    ///
    /// See [`SignatureVerifier::verify_at`].
    pub fn verify(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        self.verify_at(chrono::Utc::now().timestamp(), signature, timestamp, body)
    }

    /// Verify a request as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// - `MissingField` if either header is absent or empty
    /// - `MalformedTimestamp` if the timestamp is not an integer
    /// - `StaleRequest` if the timestamp is outside the replay window
    /// - `SignatureMismatch` if the signature does not match the body
    #[instrument(skip(self, signature, body), fields(body_len = body.len()))]
    pub fn verify_at(
        &self,
        now: i64,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let signature = signature
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingField(SIGNATURE_HEADER))?;
        let timestamp = timestamp
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingField(TIMESTAMP_HEADER))?;

        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::MalformedTimestamp(timestamp.to_string()))?;

        let age_secs = now.abs_diff(ts);
        if age_secs > self.tolerance.as_secs() {
            warn!(age_secs, "Rejecting stale Slack request");
            return Err(SignatureError::StaleRequest {
                age_secs,
                tolerance_secs: self.tolerance.as_secs(),
            });
        }

        let expected = self.sign(timestamp, body)?;
        if !constant_time_compare(&expected, signature) {
            return Err(SignatureError::SignatureMismatch);
        }

        debug!("Slack signature verified");
        Ok(())
    }

    /// Compute the `v0=<hex>` signature header for a timestamp and body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the secret cannot key an HMAC.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.signing_secret.expose_secret().as_bytes())
                .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;

        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);

        Ok(format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes())))
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: i64 = 1_700_000_000;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::from("test-signing-secret"))
    }

    /// Independent reference signature built from the documented base string.
    fn reference_signature(secret: &str, timestamp: &str, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("valid key length");
        mac.update(format!("v0:{timestamp}:{body}").as_bytes());
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(!constant_time_compare("hello", "helloo"));
    }

    #[test]
    fn test_signature_verification_valid() {
        let ts = NOW.to_string();
        let signature = reference_signature("test-signing-secret", &ts, "command=%2Fleave");
        assert!(
            verifier()
                .verify_at(NOW, Some(&signature), Some(&ts), b"command=%2Fleave")
                .is_ok()
        );
    }

    #[test]
    fn test_sign_matches_reference() {
        let ts = NOW.to_string();
        assert_eq!(
            verifier().sign(&ts, b"a=b").expect("sign"),
            reference_signature("test-signing-secret", &ts, "a=b")
        );
    }

    #[test]
    fn test_missing_headers() {
        let ts = NOW.to_string();
        assert_eq!(
            verifier().verify_at(NOW, None, Some(&ts), b"body"),
            Err(SignatureError::MissingField(SIGNATURE_HEADER))
        );
        assert_eq!(
            verifier().verify_at(NOW, Some("v0=abc"), Some(""), b"body"),
            Err(SignatureError::MissingField(TIMESTAMP_HEADER))
        );
        assert_eq!(
            verifier().verify_at(NOW, Some(""), Some(&ts), b"body"),
            Err(SignatureError::MissingField(SIGNATURE_HEADER))
        );
    }

    #[test]
    fn test_malformed_timestamp() {
        let result = verifier().verify_at(NOW, Some("v0=sig"), Some("not-a-number"), b"body");
        assert!(matches!(result, Err(SignatureError::MalformedTimestamp(_))));
    }

    #[test]
    fn test_old_timestamp_rejected_even_with_valid_signature() {
        let ts = (NOW - 600).to_string();
        let signature = reference_signature("test-signing-secret", &ts, "body");
        let result = verifier().verify_at(NOW, Some(&signature), Some(&ts), b"body");
        assert_eq!(
            result,
            Err(SignatureError::StaleRequest {
                age_secs: 600,
                tolerance_secs: 300
            })
        );
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let ts = (NOW + 301).to_string();
        let signature = reference_signature("test-signing-secret", &ts, "body");
        let result = verifier().verify_at(NOW, Some(&signature), Some(&ts), b"body");
        assert!(matches!(result, Err(SignatureError::StaleRequest { .. })));
    }

    #[test]
    fn test_boundary_of_window_accepted() {
        let ts = (NOW - 300).to_string();
        let signature = reference_signature("test-signing-secret", &ts, "body");
        assert!(
            verifier()
                .verify_at(NOW, Some(&signature), Some(&ts), b"body")
                .is_ok()
        );
    }

    #[test]
    fn test_deadbeef_signature_rejected() {
        let ts = NOW.to_string();
        let result = verifier().verify_at(NOW, Some("v0=deadbeef"), Some(&ts), b"payload=%7B%7D");
        assert_eq!(result, Err(SignatureError::SignatureMismatch));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let ts = NOW.to_string();
        let signature = reference_signature("test-signing-secret", &ts, "original=body");
        let result = verifier().verify_at(NOW, Some(&signature), Some(&ts), b"tampered=body");
        assert_eq!(result, Err(SignatureError::SignatureMismatch));
    }

    #[test]
    fn test_custom_tolerance() {
        let verifier = verifier().with_tolerance(Duration::from_secs(10));
        let ts = (NOW - 11).to_string();
        let signature = reference_signature("test-signing-secret", &ts, "body");
        assert!(verifier.verify_at(NOW, Some(&signature), Some(&ts), b"body").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug_output = format!("{:?}", verifier());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("test-signing-secret"));
    }

    proptest! {
        #[test]
        fn prop_verify_accepts_own_signature(
            secret in "[a-zA-Z0-9]{8,40}",
            body in ".{0,200}",
            skew in -300i64..=300,
        ) {
            let verifier = SignatureVerifier::new(SecretString::from(secret.clone()));
            let ts = (NOW + skew).to_string();
            let signature = reference_signature(&secret, &ts, &body);
            prop_assert!(verifier.verify_at(NOW, Some(&signature), Some(&ts), body.as_bytes()).is_ok());
        }

        #[test]
        fn prop_verify_rejects_other_secret(
            secret in "[a-z]{8,20}",
            other in "[A-Z]{8,20}",
            body in ".{0,200}",
        ) {
            let verifier = SignatureVerifier::new(SecretString::from(secret));
            let ts = NOW.to_string();
            let signature = reference_signature(&other, &ts, &body);
            prop_assert_eq!(
                verifier.verify_at(NOW, Some(&signature), Some(&ts), body.as_bytes()),
                Err(SignatureError::SignatureMismatch)
            );
        }

        #[test]
        fn prop_stale_regardless_of_signature(
            body in ".{0,100}",
            skew in prop_oneof![301i64..100_000, -100_000i64..-300],
        ) {
            let ts = (NOW + skew).to_string();
            let signature = reference_signature("test-signing-secret", &ts, &body);
            let result = verifier().verify_at(NOW, Some(&signature), Some(&ts), body.as_bytes());
            let is_stale = matches!(result, Err(SignatureError::StaleRequest { .. }));
            prop_assert!(is_stale);
        }
    }
}
