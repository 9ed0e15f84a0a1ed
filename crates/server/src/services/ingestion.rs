//! Leave ingestion.
//!
//! Every leave enters the store through [`LeaveIngestionService::ingest`],
//! whether it was filed in the Slack modal or posted to the HTTP API:
//!
//! 1. Structural validation ([`validate_for_persistence`])
//! 2. A transaction is opened and the user's lock taken
//! 3. An existing leave with the same source reference is looked up (upsert)
//! 4. Overlap validation against the user's other leaves
//! 5. Save and commit
//! 6. The sync target is told about the stored leave

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use leavedesk_core::{
    DateRange, DomainError, Leave, LeaveDuration, LeaveStatus, LeaveType, SourceRef,
    validate_for_persistence,
};

use super::overlap::validate_no_overlap;
use super::sync::LeaveSync;
use crate::db::{LeaveStore, RepositoryError};
use crate::slack::modal::LeaveForm;

/// Errors that can occur while ingesting a leave.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The request breaks a domain rule or overlaps another leave.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A leave to be created, or updated when its source reference is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveIngestRequest {
    pub user_id: String,
    pub range: DateRange,
    pub leave_type: LeaveType,
    pub duration: LeaveDuration,
    pub status: LeaveStatus,
    pub reason: Option<String>,
    /// Idempotency key.
    pub source: SourceRef,
}

impl LeaveIngestRequest {
    /// Build a request from a submitted Slack modal.
    ///
    /// The view ID keys the request, so resubmitting the same modal updates
    /// the leave it created.
    #[must_use]
    pub fn from_slack_form(user_id: impl Into<String>, view_id: &str, form: LeaveForm) -> Self {
        Self {
            user_id: user_id.into(),
            range: form.range,
            leave_type: form.leave_type,
            duration: form.duration,
            status: LeaveStatus::Requested,
            reason: form.reason,
            source: SourceRef::slack_view(view_id),
        }
    }

    fn into_leave(self) -> Leave {
        let mut leave = Leave::new(
            self.user_id,
            self.range,
            self.leave_type,
            self.duration,
            self.source,
        );
        leave.status = self.status;
        leave.reason = self.reason;
        leave
    }
}

/// Validates and stores leaves.
pub struct LeaveIngestionService {
    store: Arc<dyn LeaveStore>,
    sync: Arc<dyn LeaveSync>,
}

impl LeaveIngestionService {
    /// Create a new ingestion service.
    #[must_use]
    pub fn new(store: Arc<dyn LeaveStore>, sync: Arc<dyn LeaveSync>) -> Self {
        Self { store, sync }
    }

    /// Validate and store a leave.
    ///
    /// A request whose source reference is already stored updates that
    /// leave: the ID is kept and the source references are merged.
    ///
    /// # Errors
    ///
    /// Returns `IngestionError::Domain` for invalid requests and overlap
    /// conflicts, `IngestionError::Repository` if the store fails. A failing
    /// sync target is logged and does not fail ingestion.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, source = %request.source))]
    pub async fn ingest(&self, request: LeaveIngestRequest) -> Result<Leave, IngestionError> {
        let source = request.source.clone();
        let mut candidate = request.into_leave();
        validate_for_persistence(&candidate)?;

        let mut tx = self.store.begin().await?;
        tx.lock_user(&candidate.user_id).await?;

        if let Some(existing) = tx.find_by_source_ref(&source).await? {
            if existing.user_id != candidate.user_id {
                return Err(DomainError::InvalidState(format!(
                    "Source {source} already belongs to another user"
                ))
                .into());
            }
            candidate.id = existing.id;
            candidate.sources.extend(existing.sources);
        }

        validate_no_overlap(tx.as_mut(), &candidate).await?;

        let updating = candidate.is_persisted();
        let saved = tx.save(candidate).await?;
        tx.commit().await?;

        info!(
            leave_id = ?saved.id,
            range = %saved.range,
            updated = updating,
            "Leave stored"
        );

        if let Err(e) = self.sync.leave_saved(&saved).await {
            warn!(error = %e, leave_id = ?saved.id, "Leave sync failed");
        }

        Ok(saved)
    }
}
