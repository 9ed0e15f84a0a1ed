//! Structural invariants checked before a leave is stored.
//!
//! These rules need nothing but the leave itself. Rules that need other
//! stored leaves (overlap detection) are enforced by the server's
//! `OverlapValidator` inside the storage transaction.

use crate::error::DomainError;
use crate::types::Leave;

/// Maximum length of the free-text reason, in characters.
pub const MAX_REASON_LENGTH: usize = 2000;

/// Check the structural invariants of a leave.
///
/// # Errors
///
/// - `InvalidArgument` if the user ID is blank, the leave has no source
///   reference, or the reason is too long.
/// - `InvalidState` if the start date is after the end date, or a half-day
///   leave spans more than one day.
pub fn validate_for_persistence(leave: &Leave) -> Result<(), DomainError> {
    if leave.user_id.trim().is_empty() {
        return Err(DomainError::InvalidArgument(
            "User ID is required".to_string(),
        ));
    }

    if leave.sources.is_empty() {
        return Err(DomainError::InvalidArgument(
            "A leave must have at least one source reference".to_string(),
        ));
    }

    if leave
        .reason
        .as_ref()
        .is_some_and(|reason| reason.chars().count() > MAX_REASON_LENGTH)
    {
        return Err(DomainError::InvalidArgument(format!(
            "Reason must be at most {MAX_REASON_LENGTH} characters"
        )));
    }

    if !leave.range.is_ordered() {
        return Err(DomainError::InvalidState(
            "Start date must be on or before end date".to_string(),
        ));
    }

    if leave.duration.is_half_day() && !leave.range.is_single_day() {
        return Err(DomainError::InvalidState(
            "Half-day leaves must have the same start and end date".to_string(),
        ));
    }

    Ok(())
}
