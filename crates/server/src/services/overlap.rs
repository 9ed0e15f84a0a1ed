//! Overlap detection against stored leaves.

use leavedesk_core::{DomainError, Leave};

use super::ingestion::IngestionError;
use crate::db::LeaveTransaction;

/// Fail if `candidate` shares a day with another leave of the same user.
///
/// When `candidate` is already stored, its own ID is left out of the search.
/// The first conflict by start date, then ID, is reported. Leaves of every
/// status count, including rejected and cancelled ones.
///
/// Call this after [`LeaveTransaction::lock_user`] so the check and the
/// following write see the same data.
///
/// # Errors
///
/// Returns `DomainError::OverlapConflict` on a conflict, or the repository
/// error if the lookup fails.
pub async fn validate_no_overlap(
    tx: &mut dyn LeaveTransaction,
    candidate: &Leave,
) -> Result<(), IngestionError> {
    let existing = tx
        .find_overlapping(&candidate.user_id, &candidate.range, candidate.id)
        .await?;

    match existing.into_iter().next() {
        Some(conflict) => Err(DomainError::OverlapConflict {
            conflicting_leave_id: conflict.id.ok_or_else(|| {
                crate::db::RepositoryError::DataCorruption(
                    "stored leave without an id".to_string(),
                )
            })?,
            user_id: candidate.user_id.clone(),
            range: conflict.range,
        }
        .into()),
        None => Ok(()),
    }
}
