//! Slack Web API client.
//!
//! Provides methods for posting messages (optionally threaded), opening
//! modals and replying through a command's `response_url`.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use super::error::SlackError;
use super::types::{Block, OpenViewResponse, PostMessageResponse, SlackMessage, View};

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Outbound operations the conversation needs from Slack.
///
/// [`SlackClient`] implements this over HTTP; tests substitute a recording
/// fake.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Post a message, as a thread reply when `thread_ts` is given.
    ///
    /// Returns the new message's timestamp.
    async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError>;

    /// Open a modal using a single-use trigger ID.
    ///
    /// Returns the new view's ID.
    async fn open_view(&self, trigger_id: &str, view: View) -> Result<String, SlackError>;

    /// Send an ephemeral reply through a slash command's `response_url`.
    async fn post_ephemeral(&self, response_url: &str, text: &str) -> Result<(), SlackError>;
}

/// Slack API client.
#[derive(Clone)]
pub struct SlackClient {
    /// HTTP client.
    client: Client,
    /// Bot token for authentication.
    bot_token: SecretString,
    /// API base URL (overridable for tests against a local server).
    api_base: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Create a new Slack client.
    #[must_use]
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            api_base: SLACK_API_BASE.to_string(),
        }
    }

    /// Use a different API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    #[instrument(skip(self, blocks, fallback_text), fields(channel = %channel))]
    async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError> {
        let message = SlackMessage {
            channel: channel.to_string(),
            blocks,
            text: Some(fallback_text.to_string()),
            thread_ts: thread_ts.map(String::from),
        };

        let response = self
            .client
            .post(self.endpoint("chat.postMessage"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&message)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(
                error = ?result.error,
                "Slack API error posting message"
            );
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(
            ts = ?result.ts,
            channel = ?result.channel,
            "Message posted to Slack"
        );

        result
            .ts
            .ok_or_else(|| SlackError::Response("postMessage response has no ts".to_string()))
    }

    #[instrument(skip(self, view), fields(callback_id = %view.callback_id))]
    async fn open_view(&self, trigger_id: &str, view: View) -> Result<String, SlackError> {
        #[derive(serde::Serialize)]
        struct OpenView<'a> {
            trigger_id: &'a str,
            view: View,
        }

        let response = self
            .client
            .post(self.endpoint("views.open"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&OpenView { trigger_id, view })
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: OpenViewResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(error = ?result.error, "Slack API error opening view");
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let view_id = result
            .view
            .map(|v| v.id)
            .ok_or_else(|| SlackError::Response("views.open response has no view".to_string()))?;

        debug!(view_id = %view_id, "Modal opened in Slack");
        Ok(view_id)
    }

    #[instrument(skip(self, text))]
    async fn post_ephemeral(&self, response_url: &str, text: &str) -> Result<(), SlackError> {
        #[derive(serde::Serialize)]
        struct EphemeralMessage<'a> {
            response_type: &'static str,
            text: &'a str,
        }

        let response = self
            .client
            .post(response_url)
            .json(&EphemeralMessage {
                response_type: "ephemeral",
                text,
            })
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Response(format!(
                "Response URL returned {status}: {body}"
            )));
        }

        debug!("Responded to Slack response_url");
        Ok(())
    }
}
