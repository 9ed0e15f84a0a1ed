//! Slack Block Kit types for building messages and modals.
//!
//! These types represent the subset of the Slack Block Kit specification
//! needed for the leave request conversation: plain messages, thread replies
//! and a modal with radio buttons, date pickers and a text input.
//!
//! See: <https://api.slack.com/block-kit>

use serde::{Deserialize, Serialize};

/// A Slack message with blocks.
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    /// Channel ID to post to.
    pub channel: String,
    /// Message blocks.
    pub blocks: Vec<Block>,
    /// Optional plain text fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Parent message timestamp when replying in a thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

/// Block Kit block types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Header block with large text.
    Header { text: PlainText },
    /// Section block with text.
    Section { text: Text },
    /// Context block with small muted text.
    Context { elements: Vec<ContextElement> },
    /// Input block (modals only).
    Input {
        block_id: String,
        label: PlainText,
        element: InputElement,
        optional: bool,
    },
}

/// Text object types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

/// Plain text object (for headers, labels, titles and options).
#[derive(Debug, Clone, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    pub emoji: bool,
}

impl PlainText {
    /// Create a new plain text object.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: true,
        }
    }
}

/// Context block elements.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    /// Markdown text in context.
    Mrkdwn { text: String },
}

/// A selectable option for radio buttons.
#[derive(Debug, Clone, Serialize)]
pub struct OptionObject {
    pub text: PlainText,
    pub value: String,
}

impl OptionObject {
    /// Create an option with a label and a submitted value.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: PlainText::new(label),
            value: value.into(),
        }
    }
}

/// Interactive elements allowed inside an input block.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    /// A group of radio buttons.
    RadioButtons {
        action_id: String,
        options: Vec<OptionObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_option: Option<OptionObject>,
    },
    /// A calendar date picker (`YYYY-MM-DD`).
    Datepicker {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<PlainText>,
    },
    /// A free-text input.
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
}

/// A modal view definition for `views.open`.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    /// Always `modal`.
    #[serde(rename = "type")]
    pub view_type: &'static str,
    /// Identifies the form when its submission comes back.
    pub callback_id: String,
    pub title: PlainText,
    pub submit: PlainText,
    pub close: PlainText,
    /// Opaque string Slack stores and echoes back on submission or close.
    pub private_metadata: String,
    /// Ask Slack to send `view_closed` when the user dismisses the modal.
    pub notify_on_close: bool,
    pub blocks: Vec<Block>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID where message was posted.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from opening a view.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenViewResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// The opened view.
    #[serde(default)]
    pub view: Option<OpenedView>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// The part of an opened view we keep.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenedView {
    /// View ID assigned by Slack.
    pub id: String,
}
