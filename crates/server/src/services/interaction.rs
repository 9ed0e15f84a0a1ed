//! Leave request conversation orchestration.
//!
//! A request spans several independent webhook calls correlated only by the
//! metadata carried in the modal:
//!
//! ```text
//! SlashCommand ──► anchor posted ──► form opened ──┬─► FormSubmitted ──► Success | Failure
//!                                                  └─► FormClosed    ──► Cancelled
//! ```
//!
//! The webhook answers as soon as the event has been accepted. Opening the
//! form, ingestion and outcome messages run on the [`TaskDispatcher`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use leavedesk_core::DomainError;

use super::dispatcher::TaskDispatcher;
use super::ingestion::{IngestionError, LeaveIngestRequest, LeaveIngestionService};
use super::notifier::{ConversationNotifier, ThreadTarget};
use crate::slack::messages::{
    CANCELLED_TEXT, OPEN_FORM_FAILED_TEXT, anchor_text, build_anchor_message,
    build_cancelled_message, build_conflict_message, build_failure_message,
    build_success_message, failure_text, success_text,
};
use crate::slack::modal::{self, leave_request_view};
use crate::slack::{
    InteractionEvent, InteractionMetadata, MetadataError, SlackApi, SlashCommand, ViewClosed,
    ViewSubmission,
};

/// Message shown when a leave could not be stored for reasons the user
/// cannot fix.
const STORAGE_FAILURE_TEXT: &str =
    "Something went wrong while saving your leave. Please try again later.";

/// Errors that reject an interaction outright (HTTP 400).
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The modal's correlation state could not be decoded.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// What the webhook accepted. Later steps run in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Anchor posted (or skipped) and the form queued to open.
    CommandAccepted {
        /// Anchor timestamp, `None` when posting it failed.
        anchor_ts: Option<String>,
    },
    /// Form submission queued for ingestion.
    SubmissionAccepted,
    /// Form close queued for the cancellation message.
    CloseAccepted,
    /// Nothing to do for this event.
    Ignored,
}

/// How a leave request conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The leave was stored.
    Success,
    /// The request was rejected or could not be stored.
    Failure,
    /// The user closed the form.
    Cancelled,
}

/// Drives leave request conversations.
#[derive(Clone)]
pub struct InteractionService {
    slack: Arc<dyn SlackApi>,
    notifier: ConversationNotifier,
    ingestion: Arc<LeaveIngestionService>,
    dispatcher: TaskDispatcher,
}

impl InteractionService {
    /// Create a new interaction service.
    #[must_use]
    pub fn new(
        slack: Arc<dyn SlackApi>,
        ingestion: Arc<LeaveIngestionService>,
        dispatcher: TaskDispatcher,
    ) -> Self {
        Self {
            notifier: ConversationNotifier::new(Arc::clone(&slack)),
            slack,
            ingestion,
            dispatcher,
        }
    }

    /// Handle one decoded interaction.
    ///
    /// # Errors
    ///
    /// Returns `InteractionError::Metadata` when a form callback carries
    /// correlation state that cannot be decoded, whatever view it names.
    /// Nothing is posted in that case.
    #[instrument(skip(self, event), fields(kind = event.kind()))]
    pub async fn handle(
        &self,
        event: InteractionEvent,
    ) -> Result<Acknowledgement, InteractionError> {
        match event {
            InteractionEvent::SlashCommand(command) => Ok(self.handle_command(command).await),
            InteractionEvent::FormSubmitted(submission) => self.handle_submission(submission),
            InteractionEvent::FormClosed(closed) => self.handle_close(closed),
            InteractionEvent::BlockAction(actions) => {
                debug!(
                    user_id = %actions.user.id,
                    actions = actions.actions.len(),
                    "Block action acknowledged"
                );
                Ok(Acknowledgement::Ignored)
            }
        }
    }

    async fn handle_command(&self, command: SlashCommand) -> Acknowledgement {
        info!(
            user_id = %command.user_id,
            channel_id = %command.channel_id,
            command = %command.command,
            "Leave request started"
        );

        let anchor_ts = match self
            .slack
            .post_message(
                &command.channel_id,
                build_anchor_message(&command.user_id),
                &anchor_text(&command.user_id),
                None,
            )
            .await
        {
            Ok(ts) => Some(ts),
            Err(e) => {
                warn!(error = %e, "Failed to post anchor message, continuing without a thread");
                None
            }
        };

        let metadata = InteractionMetadata::new(
            command.user_id,
            command.channel_id,
            command.channel_name,
            anchor_ts.clone(),
        );
        let slack = Arc::clone(&self.slack);
        let notifier = self.notifier.clone();
        let trigger_id = command.trigger_id;
        let response_url = command.response_url;
        self.dispatcher.dispatch("open_leave_form", async move {
            open_leave_form(slack.as_ref(), &notifier, &trigger_id, &response_url, &metadata)
                .await;
        });

        Acknowledgement::CommandAccepted { anchor_ts }
    }

    fn handle_submission(
        &self,
        submission: ViewSubmission,
    ) -> Result<Acknowledgement, InteractionError> {
        let metadata = InteractionMetadata::decode(&submission.view.private_metadata)?;
        if submission.view.callback_id != modal::CALLBACK_ID {
            debug!(callback_id = %submission.view.callback_id, "Ignoring unknown view");
            return Ok(Acknowledgement::Ignored);
        }

        if metadata.user_id != submission.user.id {
            warn!(
                metadata_user = %metadata.user_id,
                submitting_user = %submission.user.id,
                "Form submitted by a different user than the one who opened it"
            );
        }

        let target = ThreadTarget::from(&metadata);
        let request = modal::read_leave_form(&submission.view.state).map(|form| {
            LeaveIngestRequest::from_slack_form(metadata.user_id, &submission.view.id, form)
        });

        let ingestion = Arc::clone(&self.ingestion);
        let notifier = self.notifier.clone();
        self.dispatcher.dispatch("ingest_leave", async move {
            let resolution = resolve_submission(&ingestion, &notifier, &target, request).await;
            debug!(?resolution, "Leave request resolved");
        });

        Ok(Acknowledgement::SubmissionAccepted)
    }

    fn handle_close(&self, closed: ViewClosed) -> Result<Acknowledgement, InteractionError> {
        let metadata = InteractionMetadata::decode(&closed.view.private_metadata)?;
        if closed.view.callback_id != modal::CALLBACK_ID {
            debug!(callback_id = %closed.view.callback_id, "Ignoring unknown view");
            return Ok(Acknowledgement::Ignored);
        }

        let target = ThreadTarget::from(&metadata);
        let notifier = self.notifier.clone();
        self.dispatcher.dispatch("post_cancellation", async move {
            notifier
                .notify(
                    &target,
                    build_cancelled_message(&metadata.user_id),
                    CANCELLED_TEXT,
                )
                .await;
            debug!(resolution = ?Resolution::Cancelled, "Leave request resolved");
        });

        Ok(Acknowledgement::CloseAccepted)
    }
}

/// Open the leave form, falling back to an ephemeral apology.
async fn open_leave_form(
    slack: &dyn SlackApi,
    notifier: &ConversationNotifier,
    trigger_id: &str,
    response_url: &str,
    metadata: &InteractionMetadata,
) {
    let opened = match leave_request_view(metadata) {
        Ok(view) => slack.open_view(trigger_id, view).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match opened {
        Ok(view_id) => debug!(view_id = %view_id, "Leave form opened"),
        Err(e) => {
            error!(error = %e, user_id = %metadata.user_id, "Failed to open leave form");
            notifier
                .notify_ephemeral(response_url, OPEN_FORM_FAILED_TEXT)
                .await;
        }
    }
}

/// Ingest a submitted request and post the outcome to its thread.
///
/// A request that could not be built from the form is reported the same way
/// as one rejected by ingestion.
pub async fn resolve_submission(
    ingestion: &LeaveIngestionService,
    notifier: &ConversationNotifier,
    target: &ThreadTarget,
    request: Result<LeaveIngestRequest, DomainError>,
) -> Resolution {
    let outcome = match request {
        Ok(request) => ingestion.ingest(request).await,
        Err(e) => Err(IngestionError::Domain(e)),
    };

    match outcome {
        Ok(leave) => {
            notifier
                .notify(target, build_success_message(&leave), &success_text(&leave))
                .await;
            Resolution::Success
        }
        Err(IngestionError::Domain(e)) => {
            info!(reason = %e, "Leave request rejected");
            let reason = e.reason();
            let blocks = match &e {
                DomainError::OverlapConflict {
                    conflicting_leave_id,
                    range,
                    ..
                } => build_conflict_message(range, *conflicting_leave_id),
                DomainError::InvalidArgument(_) | DomainError::InvalidState(_) => {
                    build_failure_message(&reason)
                }
            };
            notifier.notify(target, blocks, &failure_text(&reason)).await;
            Resolution::Failure
        }
        Err(IngestionError::Repository(e)) => {
            error!(error = %e, "Failed to store leave");
            notifier
                .notify(
                    target,
                    build_failure_message(STORAGE_FAILURE_TEXT),
                    &failure_text(STORAGE_FAILURE_TEXT),
                )
                .await;
            Resolution::Failure
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::{LeaveStore, LeaveTransaction, MemoryLeaveStore, RepositoryError};
    use crate::services::sync::LoggingSync;
    use crate::slack::{Block, SlackError, View, decode_interaction};
    use async_trait::async_trait;
    use leavedesk_core::{Leave, LeaveId};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // =========================================================================
    // Fakes
    // =========================================================================

    #[derive(Debug, Clone)]
    struct Posted {
        thread_ts: Option<String>,
        fallback_text: String,
        blocks: String,
    }

    /// Slack stand-in whose next `post_message` calls can be made to fail.
    #[derive(Default)]
    struct FlakySlack {
        posts: Mutex<Vec<Posted>>,
        failing_posts: AtomicUsize,
    }

    impl FlakySlack {
        fn fail_next_posts(&self, count: usize) {
            self.failing_posts.store(count, Ordering::SeqCst);
        }

        fn posts(&self) -> Vec<Posted> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SlackApi for FlakySlack {
        async fn post_message(
            &self,
            _channel: &str,
            blocks: Vec<Block>,
            fallback_text: &str,
            thread_ts: Option<&str>,
        ) -> Result<String, SlackError> {
            let failing = self
                .failing_posts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(SlackError::Api("ratelimited".to_string()));
            }

            let mut posts = self.posts.lock().unwrap();
            posts.push(Posted {
                thread_ts: thread_ts.map(str::to_string),
                fallback_text: fallback_text.to_string(),
                blocks: serde_json::to_string(&blocks).unwrap(),
            });
            Ok(format!("1700000000.{:06}", posts.len()))
        }

        async fn open_view(&self, _trigger_id: &str, _view: View) -> Result<String, SlackError> {
            Ok("V1".to_string())
        }

        async fn post_ephemeral(&self, _response_url: &str, _text: &str) -> Result<(), SlackError> {
            Ok(())
        }
    }

    /// Store that cannot open a transaction.
    struct BrokenStore;

    #[async_trait]
    impl LeaveStore for BrokenStore {
        async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, RepositoryError> {
            Err(RepositoryError::DataCorruption(
                "relation \"leaves\" does not exist".to_string(),
            ))
        }

        async fn find_by_id(&self, _id: LeaveId) -> Result<Option<Leave>, RepositoryError> {
            Err(RepositoryError::NotFound)
        }

        async fn ping(&self) -> Result<(), RepositoryError> {
            Err(RepositoryError::NotFound)
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn date(day: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn metadata(user_id: &str) -> String {
        let anchor_ts = Some("1700000000.000001".to_string());
        InteractionMetadata::new(user_id, "C1", "team-leave", anchor_ts)
            .encode()
            .unwrap()
    }

    fn form_state(start: u32, end: u32) -> Value {
        json!({
            "values": {
                "leave_type_block": {
                    "leave_type": { "type": "radio_buttons", "selected_option": { "value": "VACATION" } }
                },
                "start_date_block": {
                    "start_date": { "type": "datepicker", "selected_date": date(start) }
                },
                "end_date_block": {
                    "end_date": { "type": "datepicker", "selected_date": date(end) }
                }
            }
        })
    }

    fn event(payload: &Value) -> InteractionEvent {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &payload.to_string())
            .finish();
        decode_interaction(body.as_bytes()).unwrap()
    }

    fn submission(
        view_id: &str,
        callback_id: &str,
        private_metadata: &str,
        start: u32,
        end: u32,
    ) -> InteractionEvent {
        event(&json!({
            "type": "view_submission",
            "user": { "id": "U1" },
            "view": {
                "id": view_id,
                "callback_id": callback_id,
                "private_metadata": private_metadata,
                "state": form_state(start, end)
            }
        }))
    }

    fn closed(callback_id: &str, private_metadata: &str) -> InteractionEvent {
        event(&json!({
            "type": "view_closed",
            "user": { "id": "U1" },
            "view": {
                "id": "V9",
                "callback_id": callback_id,
                "private_metadata": private_metadata
            },
            "is_cleared": false
        }))
    }

    fn service(store: Arc<dyn LeaveStore>) -> (InteractionService, Arc<FlakySlack>, TaskDispatcher) {
        let slack = Arc::new(FlakySlack::default());
        let ingestion = Arc::new(LeaveIngestionService::new(store, Arc::new(LoggingSync)));
        let dispatcher = TaskDispatcher::new(1, 8);
        let service = InteractionService::new(slack.clone(), ingestion, dispatcher.clone());
        (service, slack, dispatcher)
    }

    // =========================================================================
    // Outcome Delivery
    // =========================================================================

    #[tokio::test]
    async fn test_failed_outcome_post_keeps_leave_and_next_request_runs() {
        let store = MemoryLeaveStore::new();
        let (service, slack, dispatcher) = service(Arc::new(store.clone()));
        slack.fail_next_posts(1);

        let ack = service
            .handle(submission("V1", modal::CALLBACK_ID, &metadata("U1"), 4, 8))
            .await
            .unwrap();
        assert_eq!(ack, Acknowledgement::SubmissionAccepted);
        dispatcher.wait_idle().await;

        assert_eq!(store.len().await, 1);
        assert!(slack.posts().is_empty());

        service
            .handle(submission("V2", modal::CALLBACK_ID, &metadata("U1"), 11, 12))
            .await
            .unwrap();
        dispatcher.wait_idle().await;

        assert_eq!(store.len().await, 2);
        let posts = slack.posts();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].blocks.contains("Leave recorded"));
        assert_eq!(posts[0].thread_ts.as_deref(), Some("1700000000.000001"));
    }

    #[tokio::test]
    async fn test_failed_cancellation_post_is_swallowed() {
        let (service, slack, dispatcher) = service(Arc::new(MemoryLeaveStore::new()));
        slack.fail_next_posts(1);

        let ack = service
            .handle(closed(modal::CALLBACK_ID, &metadata("U1")))
            .await
            .unwrap();
        assert_eq!(ack, Acknowledgement::CloseAccepted);
        dispatcher.wait_idle().await;
        assert!(slack.posts().is_empty());

        service
            .handle(closed(modal::CALLBACK_ID, &metadata("U1")))
            .await
            .unwrap();
        dispatcher.wait_idle().await;

        let posts = slack.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].fallback_text, CANCELLED_TEXT);
    }

    #[tokio::test]
    async fn test_storage_failure_posts_generic_reply() {
        let slack = Arc::new(FlakySlack::default());
        let notifier = ConversationNotifier::new(slack.clone());
        let ingestion = LeaveIngestionService::new(Arc::new(BrokenStore), Arc::new(LoggingSync));
        let target = ThreadTarget {
            channel_id: "C1".to_string(),
            thread_ts: Some("1700000000.000001".to_string()),
        };
        let state = serde_json::from_value(form_state(4, 8)).unwrap();
        let request = modal::read_leave_form(&state)
            .map(|form| LeaveIngestRequest::from_slack_form("U1", "V1", form));

        let resolution = resolve_submission(&ingestion, &notifier, &target, request).await;

        assert_eq!(resolution, Resolution::Failure);
        let posts = slack.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].fallback_text, failure_text(STORAGE_FAILURE_TEXT));
        assert!(posts[0].blocks.contains(STORAGE_FAILURE_TEXT));
        assert!(!posts[0].blocks.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_invalid_form_resolves_as_failure() {
        let store = MemoryLeaveStore::new();
        let slack = Arc::new(FlakySlack::default());
        let notifier = ConversationNotifier::new(slack.clone());
        let ingestion = LeaveIngestionService::new(Arc::new(store.clone()), Arc::new(LoggingSync));
        let target = ThreadTarget {
            channel_id: "C1".to_string(),
            thread_ts: None,
        };
        let request = Err(DomainError::InvalidArgument("Start date is required".to_string()));

        let resolution = resolve_submission(&ingestion, &notifier, &target, request).await;

        assert_eq!(resolution, Resolution::Failure);
        assert!(store.is_empty().await);
        assert!(slack.posts()[0].blocks.contains("Start date is required"));
    }

    // =========================================================================
    // Metadata Handling
    // =========================================================================

    #[tokio::test]
    async fn test_corrupt_metadata_rejected_for_unknown_view() {
        let (service, slack, dispatcher) = service(Arc::new(MemoryLeaveStore::new()));

        let result = service
            .handle(submission("V1", "some_other_modal", "{not json", 4, 8))
            .await;
        assert!(matches!(result, Err(InteractionError::Metadata(_))));

        let result = service.handle(closed("some_other_modal", "")).await;
        assert!(matches!(result, Err(InteractionError::Metadata(_))));

        dispatcher.wait_idle().await;
        assert!(slack.posts().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_view_with_valid_metadata_is_ignored() {
        let store = MemoryLeaveStore::new();
        let (service, slack, dispatcher) = service(Arc::new(store.clone()));

        let ack = service
            .handle(submission("V1", "some_other_modal", &metadata("U1"), 4, 8))
            .await
            .unwrap();
        assert_eq!(ack, Acknowledgement::Ignored);

        let ack = service
            .handle(closed("some_other_modal", &metadata("U1")))
            .await
            .unwrap();
        assert_eq!(ack, Acknowledgement::Ignored);

        dispatcher.wait_idle().await;
        assert!(store.is_empty().await);
        assert!(slack.posts().is_empty());
    }
}
