//! Decoding of Slack webhook bodies into typed interaction events.
//!
//! Slack delivers two body shapes, both `application/x-www-form-urlencoded`:
//!
//! - Slash commands send their fields directly (`command=/leave&user_id=...`).
//! - Interactive callbacks send a single `payload` field holding a JSON
//!   document whose `type` selects the variant.
//!
//! Unknown JSON fields in the envelope are ignored so that Slack can add
//! fields without breaking us. Strictness is reserved for the correlation
//! state we put in `private_metadata` ourselves (see [`super::metadata`]).

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::PayloadError;

/// A slash command invocation.
///
/// Absent fields are left empty rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    /// Single-use token that authorizes one `views.open` within a few seconds.
    pub trigger_id: String,
    pub user_id: String,
    pub user_name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub team_id: String,
    pub team_domain: String,
    /// URL accepting ephemeral replies to the invoking user.
    pub response_url: String,
    pub api_app_id: String,
}

/// A decoded inbound interaction.
#[derive(Debug, Clone)]
pub enum InteractionEvent {
    /// `/leave` was invoked.
    SlashCommand(SlashCommand),
    /// The modal was submitted (`view_submission`).
    FormSubmitted(ViewSubmission),
    /// The modal was dismissed (`view_closed`).
    FormClosed(ViewClosed),
    /// A button or other block element was used (`block_actions`).
    BlockAction(BlockActions),
}

impl InteractionEvent {
    /// Short name of the variant, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SlashCommand(_) => "slash_command",
            Self::FormSubmitted(_) => "view_submission",
            Self::FormClosed(_) => "view_closed",
            Self::BlockAction(_) => "block_actions",
        }
    }
}

/// Workspace that an interaction came from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamRef {
    pub id: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// User who triggered an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// Slack user ID.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// `view_submission` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewSubmission {
    #[serde(default)]
    pub team: Option<TeamRef>,
    pub user: InteractionUser,
    #[serde(default)]
    pub trigger_id: Option<String>,
    pub view: ViewPayload,
}

/// `view_closed` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewClosed {
    #[serde(default)]
    pub team: Option<TeamRef>,
    pub user: InteractionUser,
    pub view: ViewPayload,
    /// True when the whole view stack was cleared at once.
    #[serde(default)]
    pub is_cleared: bool,
}

/// `block_actions` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockActions {
    #[serde(default)]
    pub team: Option<TeamRef>,
    pub user: InteractionUser,
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
}

/// Action that was triggered.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID (set when creating the element).
    pub action_id: String,
    /// Block ID containing this action.
    #[serde(default)]
    pub block_id: Option<String>,
    /// Value attached to the action.
    #[serde(default)]
    pub value: Option<String>,
}

/// The view part of submission and close payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewPayload {
    /// View ID, stable across resubmissions of the same modal.
    pub id: String,
    #[serde(default)]
    pub callback_id: String,
    /// Opaque string we set when opening the view.
    #[serde(default)]
    pub private_metadata: String,
    #[serde(default)]
    pub state: ViewState,
}

/// Submitted input values: block ID → action ID → value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, FieldValue>>,
}

impl ViewState {
    /// Look up the value submitted for an element.
    #[must_use]
    pub fn get(&self, block_id: &str, action_id: &str) -> Option<&FieldValue> {
        self.values.get(block_id)?.get(action_id)
    }
}

/// A typed input value from a submitted modal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldValue {
    /// Radio button group selection.
    RadioButtons {
        #[serde(default)]
        selected_option: Option<SelectedOption>,
    },
    /// Date picker value.
    Datepicker {
        #[serde(default)]
        selected_date: Option<NaiveDate>,
    },
    /// Free-text input value.
    PlainTextInput {
        #[serde(default)]
        value: Option<String>,
    },
    /// Any element type this service does not read.
    #[serde(other)]
    Unsupported,
}

/// The option picked in a radio group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

/// Parse a form-encoded body into a field map.
///
/// Later duplicates of a key override earlier ones.
///
/// # Errors
///
/// Returns `MalformedPayload` if the body is empty, not UTF-8, or has a
/// segment that is not a `name=value` pair.
pub fn parse_form(body: &[u8]) -> Result<HashMap<String, String>, PayloadError> {
    if body.is_empty() {
        return Err(PayloadError::MalformedPayload("empty body".to_string()));
    }
    let raw = std::str::from_utf8(body)
        .map_err(|e| PayloadError::MalformedPayload(format!("body is not UTF-8: {e}")))?;

    if !raw.split('&').filter(|pair| !pair.is_empty()).all(is_form_pair) {
        return Err(PayloadError::MalformedPayload(
            "body is not form-encoded".to_string(),
        ));
    }

    Ok(url::form_urlencoded::parse(body).into_owned().collect())
}

/// A segment is a pair when it has a field name before `=` made only of
/// characters a form encoder leaves in names.
fn is_form_pair(pair: &str) -> bool {
    pair.split_once('=').is_some_and(|(name, _)| {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '%' | '+' | '*'))
    })
}

/// Decode a slash command body.
///
/// # Errors
///
/// Returns `MalformedPayload` if the body is not a form.
pub fn decode_slash_command(body: &[u8]) -> Result<SlashCommand, PayloadError> {
    let mut fields = parse_form(body)?;
    let mut take = |key: &str| fields.remove(key).unwrap_or_default();

    Ok(SlashCommand {
        command: take("command"),
        text: take("text"),
        trigger_id: take("trigger_id"),
        user_id: take("user_id"),
        user_name: take("user_name"),
        channel_id: take("channel_id"),
        channel_name: take("channel_name"),
        team_id: take("team_id"),
        team_domain: take("team_domain"),
        response_url: take("response_url"),
        api_app_id: take("api_app_id"),
    })
}

/// Decode an interactive callback body (`payload=<json>`).
///
/// # Errors
///
/// - `MalformedPayload` for a non-form body, a missing `payload` field,
///   invalid JSON, or a variant missing required fields
/// - `MissingTypeField` if the JSON has no string `type`
/// - `UnsupportedType` for interaction types this service does not handle
pub fn decode_interaction(body: &[u8]) -> Result<InteractionEvent, PayloadError> {
    let mut fields = parse_form(body)?;
    let raw = fields
        .remove("payload")
        .ok_or_else(|| PayloadError::MalformedPayload("missing payload field".to_string()))?;

    let envelope: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| PayloadError::MalformedPayload(format!("invalid JSON: {e}")))?;

    let interaction_type = envelope
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(PayloadError::MissingTypeField)?
        .to_string();

    match interaction_type.as_str() {
        "view_submission" => decode_variant(envelope).map(InteractionEvent::FormSubmitted),
        "view_closed" => decode_variant(envelope).map(InteractionEvent::FormClosed),
        "block_actions" => decode_variant(envelope).map(InteractionEvent::BlockAction),
        _ => Err(PayloadError::UnsupportedType(interaction_type)),
    }
}

fn decode_variant<T: DeserializeOwned>(envelope: serde_json::Value) -> Result<T, PayloadError> {
    serde_json::from_value(envelope)
        .map_err(|e| PayloadError::MalformedPayload(format!("invalid interaction payload: {e}")))
}
