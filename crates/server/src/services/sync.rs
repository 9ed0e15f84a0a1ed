//! Outbound sync of stored leaves to downstream systems.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use leavedesk_core::Leave;

/// Errors reported by a sync target.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The downstream system rejected or did not receive the leave.
    #[error("sync failed: {0}")]
    Failed(String),
}

/// Receives every leave after it has been committed.
///
/// Failures are logged by the caller and never undo the stored leave.
#[async_trait]
pub trait LeaveSync: Send + Sync {
    /// Called once per successful ingestion.
    async fn leave_saved(&self, leave: &Leave) -> Result<(), SyncError>;
}

/// Sync target that only records the event in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSync;

#[async_trait]
impl LeaveSync for LoggingSync {
    async fn leave_saved(&self, leave: &Leave) -> Result<(), SyncError> {
        info!(
            leave_id = ?leave.id,
            user_id = %leave.user_id,
            range = %leave.range,
            status = %leave.status,
            "Leave saved"
        );
        Ok(())
    }
}
