//! Correlation state carried through a modal's `private_metadata`.
//!
//! When the leave form is opened we do not know when, or whether, Slack will
//! call back. Everything needed to reply in the right conversation travels
//! inside the view as an opaque string and comes back with the
//! `view_submission` or `view_closed` payload.
//!
//! Decoding is strict: the JSON must contain exactly the four known keys.
//! Anything else means the state was corrupted or produced by a different
//! version, and the callback is rejected instead of resumed.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::MetadataError;

/// Conversation coordinates for an in-flight leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InteractionMetadata {
    /// Slack user who invoked the command.
    pub user_id: String,
    /// Channel where the command was invoked.
    pub channel_id: String,
    /// Channel display name.
    pub channel_name: String,
    /// Timestamp of the anchor message, or `None` when it could not be posted.
    // deserialize_with disables serde's implicit default for Option, so the
    // key must be present even when its value is null.
    #[serde(deserialize_with = "nullable")]
    pub thread_ts: Option<String>,
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

impl InteractionMetadata {
    /// Create the state for a conversation.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        channel_name: impl Into<String>,
        thread_ts: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            channel_name: channel_name.into(),
            thread_ts,
        }
    }

    /// Encode as canonical JSON (`userId, channelId, channelName, threadTs`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if serialization fails.
    pub fn encode(&self) -> Result<String, MetadataError> {
        serde_json::to_string(self).map_err(|e| MetadataError::InvalidState(e.to_string()))
    }

    /// Decode state previously produced by [`InteractionMetadata::encode`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for empty, `null` or malformed input, unknown
    /// keys, or missing keys.
    pub fn decode(raw: &str) -> Result<Self, MetadataError> {
        if raw.trim().is_empty() {
            return Err(MetadataError::InvalidState(
                "metadata is empty".to_string(),
            ));
        }
        serde_json::from_str(raw).map_err(|e| MetadataError::InvalidState(e.to_string()))
    }
}

/// Extract the user ID from encoded metadata.
///
/// # Errors
///
/// Propagates the [`InteractionMetadata::decode`] failure.
pub fn extract_user_id(raw: &str) -> Result<String, MetadataError> {
    InteractionMetadata::decode(raw).map(|m| m.user_id)
}

/// Extract the channel ID from encoded metadata.
///
/// # Errors
///
/// Propagates the [`InteractionMetadata::decode`] failure.
pub fn extract_channel_id(raw: &str) -> Result<String, MetadataError> {
    InteractionMetadata::decode(raw).map(|m| m.channel_id)
}

/// Extract the channel name from encoded metadata.
///
/// # Errors
///
/// Propagates the [`InteractionMetadata::decode`] failure.
pub fn extract_channel_name(raw: &str) -> Result<String, MetadataError> {
    InteractionMetadata::decode(raw).map(|m| m.channel_name)
}

/// Extract the anchor thread timestamp from encoded metadata.
///
/// # Errors
///
/// Propagates the [`InteractionMetadata::decode`] failure.
pub fn extract_thread_ts(raw: &str) -> Result<Option<String>, MetadataError> {
    InteractionMetadata::decode(raw).map(|m| m.thread_ts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> InteractionMetadata {
        InteractionMetadata::new("U1", "C1", "general", Some("1700000000.000100".to_string()))
    }

    #[test]
    fn test_encode_is_canonical() {
        assert_eq!(
            sample().encode().unwrap(),
            r#"{"userId":"U1","channelId":"C1","channelName":"general","threadTs":"1700000000.000100"}"#
        );
    }

    #[test]
    fn test_encode_null_thread() {
        let metadata = InteractionMetadata::new("U1", "C1", "general", None);
        let encoded = metadata.encode().unwrap();
        assert!(encoded.ends_with(r#""threadTs":null}"#));
        assert_eq!(InteractionMetadata::decode(&encoded).unwrap(), metadata);
    }

    #[test]
    fn test_decode_rejects_unknown_key() {
        let raw = r#"{"userId":"U1","channelId":"C1","channelName":"g","threadTs":null,"admin":true}"#;
        assert!(matches!(
            InteractionMetadata::decode(raw),
            Err(MetadataError::InvalidState(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_key() {
        let raw = r#"{"userId":"U1","channelId":"C1","channelName":"g"}"#;
        assert!(InteractionMetadata::decode(raw).is_err());
    }

    #[test]
    fn test_decode_rejects_null_empty_and_garbage() {
        assert!(InteractionMetadata::decode("").is_err());
        assert!(InteractionMetadata::decode("   ").is_err());
        assert!(InteractionMetadata::decode("null").is_err());
        assert!(InteractionMetadata::decode("{").is_err());
        assert!(InteractionMetadata::decode("[]").is_err());
    }

    #[test]
    fn test_extractors() {
        let raw = sample().encode().unwrap();
        assert_eq!(extract_user_id(&raw).unwrap(), "U1");
        assert_eq!(extract_channel_id(&raw).unwrap(), "C1");
        assert_eq!(extract_channel_name(&raw).unwrap(), "general");
        assert_eq!(
            extract_thread_ts(&raw).unwrap().as_deref(),
            Some("1700000000.000100")
        );
    }

    #[test]
    fn test_extractors_propagate_failure() {
        assert!(extract_user_id("{}").is_err());
        assert!(extract_thread_ts("nope").is_err());
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            user in "[A-Z0-9]{1,12}",
            channel in "[A-Z0-9]{1,12}",
            name in ".{0,40}",
            thread in proptest::option::of("[0-9]{10}\\.[0-9]{6}"),
        ) {
            let metadata = InteractionMetadata::new(user, channel, name, thread);
            let encoded = metadata.encode().unwrap();
            prop_assert_eq!(InteractionMetadata::decode(&encoded).unwrap(), metadata);
        }

        #[test]
        fn prop_extra_key_rejected(key in "[a-z]{1,10}") {
            prop_assume!(!["userId", "channelId", "channelName", "threadTs"].contains(&key.as_str()));
            let raw = format!(
                r#"{{"userId":"U1","channelId":"C1","channelName":"g","threadTs":null,"{key}":1}}"#
            );
            prop_assert!(InteractionMetadata::decode(&raw).is_err());
        }
    }
}
