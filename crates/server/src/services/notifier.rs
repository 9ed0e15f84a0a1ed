//! Best-effort delivery of conversation updates to Slack.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::slack::{Block, InteractionMetadata, SlackApi};

/// Where outcome messages for one leave request go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadTarget {
    pub channel_id: String,
    /// Anchor message timestamp; `None` posts to the channel directly.
    pub thread_ts: Option<String>,
}

impl From<&InteractionMetadata> for ThreadTarget {
    fn from(metadata: &InteractionMetadata) -> Self {
        Self {
            channel_id: metadata.channel_id.clone(),
            thread_ts: metadata.thread_ts.clone(),
        }
    }
}

/// Posts messages into a request's thread, logging instead of failing.
#[derive(Clone)]
pub struct ConversationNotifier {
    slack: Arc<dyn SlackApi>,
}

impl ConversationNotifier {
    /// Create a notifier over a Slack client.
    #[must_use]
    pub fn new(slack: Arc<dyn SlackApi>) -> Self {
        Self { slack }
    }

    /// Post `blocks` to the target thread.
    ///
    /// Delivery failures are logged and swallowed.
    pub async fn notify(&self, target: &ThreadTarget, blocks: Vec<Block>, fallback_text: &str) {
        match self
            .slack
            .post_message(
                &target.channel_id,
                blocks,
                fallback_text,
                target.thread_ts.as_deref(),
            )
            .await
        {
            Ok(ts) => debug!(channel = %target.channel_id, ts = %ts, "Conversation updated"),
            Err(e) => warn!(
                error = %e,
                channel = %target.channel_id,
                thread_ts = ?target.thread_ts,
                "Failed to post conversation update"
            ),
        }
    }

    /// Send an ephemeral reply through a command's response URL.
    ///
    /// Delivery failures are logged and swallowed.
    pub async fn notify_ephemeral(&self, response_url: &str, text: &str) {
        if response_url.is_empty() {
            debug!("No response URL, skipping ephemeral reply");
            return;
        }
        if let Err(e) = self.slack.post_ephemeral(response_url, text).await {
            warn!(error = %e, "Failed to send ephemeral reply");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::slack::{SlackError, Text, View};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Slack stand-in that records deliveries or rejects all of them.
    #[derive(Default)]
    struct StubSlack {
        reject: bool,
        threads: Mutex<Vec<(String, Option<String>)>>,
        ephemerals: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SlackApi for StubSlack {
        async fn post_message(
            &self,
            channel: &str,
            _blocks: Vec<Block>,
            _fallback_text: &str,
            thread_ts: Option<&str>,
        ) -> Result<String, SlackError> {
            if self.reject {
                return Err(SlackError::Request("connection reset".to_string()));
            }
            self.threads
                .lock()
                .unwrap()
                .push((channel.to_string(), thread_ts.map(str::to_string)));
            Ok("1700000000.000002".to_string())
        }

        async fn open_view(&self, _trigger_id: &str, _view: View) -> Result<String, SlackError> {
            Ok("V1".to_string())
        }

        async fn post_ephemeral(&self, response_url: &str, _text: &str) -> Result<(), SlackError> {
            if self.reject {
                return Err(SlackError::Api("expired_url".to_string()));
            }
            self.ephemerals.lock().unwrap().push(response_url.to_string());
            Ok(())
        }
    }

    fn blocks() -> Vec<Block> {
        vec![Block::Section {
            text: Text::mrkdwn("Leave request cancelled"),
        }]
    }

    #[test]
    fn test_target_from_metadata() {
        let metadata =
            InteractionMetadata::new("U1", "C1", "general", Some("1700000000.000001".to_string()));
        let target = ThreadTarget::from(&metadata);
        assert_eq!(target.channel_id, "C1");
        assert_eq!(target.thread_ts.as_deref(), Some("1700000000.000001"));
    }

    #[tokio::test]
    async fn test_notify_posts_into_thread() {
        let slack = Arc::new(StubSlack::default());
        let notifier = ConversationNotifier::new(slack.clone());
        let target = ThreadTarget {
            channel_id: "C1".to_string(),
            thread_ts: Some("1700000000.000001".to_string()),
        };

        notifier.notify(&target, blocks(), "cancelled").await;

        let threads = slack.threads.lock().unwrap().clone();
        assert_eq!(
            threads,
            vec![("C1".to_string(), Some("1700000000.000001".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_delivery_failures_are_swallowed() {
        let slack = Arc::new(StubSlack {
            reject: true,
            ..StubSlack::default()
        });
        let notifier = ConversationNotifier::new(slack.clone());
        let target = ThreadTarget {
            channel_id: "C1".to_string(),
            thread_ts: None,
        };

        notifier.notify(&target, blocks(), "cancelled").await;
        notifier
            .notify_ephemeral("https://hooks.slack.com/commands/1", "sorry")
            .await;

        assert!(slack.threads.lock().unwrap().is_empty());
        assert!(slack.ephemerals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ephemeral_skipped_without_response_url() {
        let slack = Arc::new(StubSlack::default());
        let notifier = ConversationNotifier::new(slack.clone());

        notifier.notify_ephemeral("", "sorry").await;
        notifier
            .notify_ephemeral("https://hooks.slack.com/commands/1", "sorry")
            .await;

        let ephemerals = slack.ephemerals.lock().unwrap().clone();
        assert_eq!(ephemerals, vec!["https://hooks.slack.com/commands/1".to_string()]);
    }
}
