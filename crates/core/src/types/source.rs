//! Source references linking a stored leave to the record that created it.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Idempotency key for leave ingestion.
///
/// A `(system, external_id)` pair is unique across all stored leaves and is
/// owned by exactly one leave. Ingesting a request carrying a source reference
/// that already exists updates that leave instead of creating another one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Tag of the system the leave came from (e.g. `slack`, `api`).
    pub system: String,
    /// Identifier of the record inside that system.
    pub external_id: String,
}

impl SourceRef {
    /// Tag used for leaves filed through the Slack modal.
    pub const SLACK: &'static str = "slack";
    /// Tag used for leaves filed through the HTTP API.
    pub const API: &'static str = "api";

    /// Create a source reference.
    #[must_use]
    pub fn new(system: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            external_id: external_id.into(),
        }
    }

    /// Source reference for a Slack modal submission, keyed by view ID.
    ///
    /// Resubmitting the same view yields the same reference.
    #[must_use]
    pub fn slack_view(view_id: impl Into<String>) -> Self {
        Self::new(Self::SLACK, view_id)
    }

    /// Source reference for an API request.
    #[must_use]
    pub fn api(external_id: impl Into<String>) -> Self {
        Self::new(Self::API, external_id)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_view_reference() {
        let source = SourceRef::slack_view("V0123");
        assert_eq!(source.system, "slack");
        assert_eq!(source.to_string(), "slack:V0123");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&SourceRef::api("req-1")).expect("serialize");
        assert_eq!(json, r#"{"system":"api","externalId":"req-1"}"#);
    }
}
