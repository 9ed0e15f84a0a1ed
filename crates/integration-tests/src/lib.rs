//! Integration test harness for Leavedesk.
//!
//! Wires the real services, router and in-memory store to a recording
//! stand-in for the Slack Web API, so whole conversations can be driven
//! without network access.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p leavedesk-integration-tests
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::{Value, json};

use leavedesk_server::db::MemoryLeaveStore;
use leavedesk_server::services::{LoggingSync, TaskDispatcher};
use leavedesk_server::slack::{
    Block, SIGNATURE_HEADER, SignatureVerifier, SlackApi, SlackError, TIMESTAMP_HEADER, View,
};
use leavedesk_server::state::AppState;

/// Signing secret shared by the test router and [`TestApp::signed_post`].
pub const SIGNING_SECRET: &str = "integration-test-signing-secret";

/// Bearer token accepted by [`TestApp::with_api`].
pub const API_TOKEN: &str = "k3Jq9vXz2LmP8wRt5YbN7cHd4FgS6aUe";

// =============================================================================
// Recording Slack
// =============================================================================

/// A message posted through [`SlackApi::post_message`].
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub channel: String,
    pub thread_ts: Option<String>,
    pub fallback_text: String,
    /// Serialized Block Kit blocks.
    pub blocks: Value,
}

impl PostedMessage {
    /// Returns true if the fallback text or any block mentions `needle`.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.fallback_text.contains(needle) || self.blocks.to_string().contains(needle)
    }
}

/// A modal opened through [`SlackApi::open_view`].
#[derive(Debug, Clone)]
pub struct OpenedView {
    pub trigger_id: String,
    pub view_id: String,
    pub callback_id: String,
    pub private_metadata: String,
}

#[derive(Default)]
struct Recorded {
    posts: Vec<PostedMessage>,
    views: Vec<OpenedView>,
    ephemerals: Vec<(String, String)>,
}

/// Fake Slack Web API that records every call.
#[derive(Default)]
pub struct RecordingSlack {
    recorded: Mutex<Recorded>,
    next_ts: AtomicUsize,
    failing_posts: AtomicUsize,
    fail_open_view: AtomicBool,
}

impl RecordingSlack {
    /// Make the next `count` `post_message` calls fail.
    pub fn fail_next_posts(&self, count: usize) {
        self.failing_posts.store(count, Ordering::SeqCst);
    }

    /// Make every `open_view` call fail (e.g. an expired trigger).
    pub fn fail_open_view(&self) {
        self.fail_open_view.store(true, Ordering::SeqCst);
    }

    /// Messages posted so far.
    pub fn posts(&self) -> Vec<PostedMessage> {
        self.lock().posts.clone()
    }

    /// Views opened so far.
    pub fn views(&self) -> Vec<OpenedView> {
        self.lock().views.clone()
    }

    /// Ephemeral replies as `(response_url, text)`.
    pub fn ephemerals(&self) -> Vec<(String, String)> {
        self.lock().ephemerals.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self) -> bool {
        self.failing_posts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SlackApi for RecordingSlack {
    async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError> {
        if self.take_failure() {
            return Err(SlackError::Api("channel_not_found".to_string()));
        }

        let ts = format!("1700000000.{:06}", self.next_ts.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock().posts.push(PostedMessage {
            channel: channel.to_string(),
            thread_ts: thread_ts.map(str::to_string),
            fallback_text: fallback_text.to_string(),
            blocks: serde_json::to_value(&blocks).unwrap_or(Value::Null),
        });
        Ok(ts)
    }

    async fn open_view(&self, trigger_id: &str, view: View) -> Result<String, SlackError> {
        if self.fail_open_view.load(Ordering::SeqCst) {
            return Err(SlackError::Api("expired_trigger_id".to_string()));
        }

        let mut recorded = self.lock();
        let view_id = format!("V{:04}", recorded.views.len() + 1);
        recorded.views.push(OpenedView {
            trigger_id: trigger_id.to_string(),
            view_id: view_id.clone(),
            callback_id: view.callback_id,
            private_metadata: view.private_metadata,
        });
        Ok(view_id)
    }

    async fn post_ephemeral(&self, response_url: &str, text: &str) -> Result<(), SlackError> {
        self.lock()
            .ephemerals
            .push((response_url.to_string(), text.to_string()));
        Ok(())
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// Application state wired to the recording Slack and an in-memory store.
pub struct TestApp {
    pub state: AppState,
    pub slack: Arc<RecordingSlack>,
    pub store: MemoryLeaveStore,
    pub dispatcher: TaskDispatcher,
    verifier: SignatureVerifier,
}

impl TestApp {
    /// Build an app with the leave API disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Build an app with the leave API enabled under [`API_TOKEN`].
    #[must_use]
    pub fn with_api() -> Self {
        Self::build(Some(SecretString::from(API_TOKEN)))
    }

    fn build(api_token: Option<SecretString>) -> Self {
        let slack = Arc::new(RecordingSlack::default());
        let store = MemoryLeaveStore::new();
        let dispatcher = TaskDispatcher::new(2, 16);
        let verifier = SignatureVerifier::new(SecretString::from(SIGNING_SECRET));

        let state = AppState::new(
            verifier.clone(),
            Arc::new(store.clone()),
            slack.clone(),
            Arc::new(LoggingSync),
            dispatcher.clone(),
            api_token,
        );

        Self {
            state,
            slack,
            store,
            dispatcher,
            verifier,
        }
    }

    /// The full application router.
    #[must_use]
    pub fn router(&self) -> Router {
        leavedesk_server::app(self.state.clone())
    }

    /// Wait until all background Slack work has finished.
    pub async fn settle(&self) {
        self.dispatcher.wait_idle().await;
    }

    /// Build a correctly signed form POST.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    #[must_use]
    pub fn signed_post(&self, uri: &str, body: String) -> Request<Body> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self
            .verifier
            .sign(&timestamp, body.as_bytes())
            .expect("sign body");

        Request::post(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .expect("build request")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Payload Builders
// =============================================================================

/// Form body of a `/leave` slash command.
#[must_use]
pub fn slash_command_body(user_id: &str, channel_id: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("command", "/leave")
        .append_pair("text", "")
        .append_pair("trigger_id", "13345224609.738474920.8088930838d88f008e0")
        .append_pair("user_id", user_id)
        .append_pair("user_name", "sam")
        .append_pair("channel_id", channel_id)
        .append_pair("channel_name", "team-leave")
        .append_pair("team_id", "T0001")
        .append_pair("team_domain", "example")
        .append_pair("response_url", "https://hooks.slack.com/commands/T0001/1/abc")
        .append_pair("api_app_id", "A0001")
        .finish()
}

/// Wrap an interaction JSON payload in Slack's `payload=` form encoding.
#[must_use]
pub fn interaction_body(payload: &Value) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", &payload.to_string())
        .finish()
}

/// Values entered in the leave form.
#[derive(Debug, Clone)]
pub struct FormInput {
    pub leave_type: &'static str,
    pub duration: Option<&'static str>,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub reason: Option<&'static str>,
}

impl FormInput {
    /// A vacation from `start` to `end`.
    #[must_use]
    pub const fn vacation(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            leave_type: "VACATION",
            duration: None,
            start,
            end,
            reason: None,
        }
    }

    fn state(&self) -> Value {
        let option = |value: Option<&str>| value.map(|v| json!({ "value": v }));
        json!({
            "values": {
                "leave_type_block": {
                    "leave_type": { "type": "radio_buttons", "selected_option": option(Some(self.leave_type)) }
                },
                "duration_block": {
                    "duration": { "type": "radio_buttons", "selected_option": option(self.duration) }
                },
                "start_date_block": {
                    "start_date": { "type": "datepicker", "selected_date": self.start }
                },
                "end_date_block": {
                    "end_date": { "type": "datepicker", "selected_date": self.end }
                },
                "reason_block": {
                    "reason": { "type": "plain_text_input", "value": self.reason }
                }
            }
        })
    }
}

/// A `view_submission` payload for the leave form.
#[must_use]
pub fn view_submission(user_id: &str, view: &OpenedView, input: &FormInput) -> Value {
    json!({
        "type": "view_submission",
        "team": { "id": "T0001", "domain": "example" },
        "user": { "id": user_id, "username": "sam" },
        "view": {
            "id": view.view_id,
            "callback_id": view.callback_id,
            "private_metadata": view.private_metadata,
            "state": input.state()
        }
    })
}

/// A `view_closed` payload for the leave form.
#[must_use]
pub fn view_closed(user_id: &str, view: &OpenedView) -> Value {
    json!({
        "type": "view_closed",
        "team": { "id": "T0001" },
        "user": { "id": user_id },
        "view": {
            "id": view.view_id,
            "callback_id": view.callback_id,
            "private_metadata": view.private_metadata
        },
        "is_cleared": false
    })
}

/// Shorthand for a 2024 date.
///
/// # Panics
///
/// Panics on an invalid month or day.
#[must_use]
pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).expect("valid date")
}
