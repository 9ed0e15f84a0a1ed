//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;

use crate::db::LeaveStore;
use crate::services::{InteractionService, LeaveIngestionService, LeaveSync, TaskDispatcher};
use crate::slack::{SignatureVerifier, SlackApi};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    verifier: SignatureVerifier,
    store: Arc<dyn LeaveStore>,
    ingestion: Arc<LeaveIngestionService>,
    interactions: InteractionService,
    api_token: Option<SecretString>,
}

impl AppState {
    /// Wire the services together.
    #[must_use]
    pub fn new(
        verifier: SignatureVerifier,
        store: Arc<dyn LeaveStore>,
        slack: Arc<dyn SlackApi>,
        sync: Arc<dyn LeaveSync>,
        dispatcher: TaskDispatcher,
        api_token: Option<SecretString>,
    ) -> Self {
        let ingestion = Arc::new(LeaveIngestionService::new(Arc::clone(&store), sync));
        let interactions =
            InteractionService::new(slack, Arc::clone(&ingestion), dispatcher);

        Self {
            inner: Arc::new(AppStateInner {
                verifier,
                store,
                ingestion,
                interactions,
                api_token,
            }),
        }
    }

    /// Webhook signature verifier.
    #[must_use]
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.inner.verifier
    }

    /// Leave store.
    #[must_use]
    pub fn store(&self) -> &dyn LeaveStore {
        self.inner.store.as_ref()
    }

    /// Leave ingestion service.
    #[must_use]
    pub fn ingestion(&self) -> &LeaveIngestionService {
        &self.inner.ingestion
    }

    /// Slack conversation orchestrator.
    #[must_use]
    pub fn interactions(&self) -> &InteractionService {
        &self.inner.interactions
    }

    /// Bearer token for the leave API, if enabled.
    #[must_use]
    pub fn api_token(&self) -> Option<&SecretString> {
        self.inner.api_token.as_ref()
    }
}
