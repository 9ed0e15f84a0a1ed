//! Domain errors.
//!
//! These are the errors an end user can cause and fix: they are rendered as
//! conversational rejection messages in Slack and as 4xx responses in the API.

use thiserror::Error;

use crate::types::{DateRange, LeaveId};

/// Errors raised while validating a leave.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An input value is missing or out of bounds.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A rule spanning several fields is violated.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The leave overlaps another leave of the same user.
    #[error(
        "Leave overlaps existing leave {conflicting_leave_id} for user {user_id} ({range})"
    )]
    OverlapConflict {
        /// ID of the stored leave that conflicts.
        conflicting_leave_id: LeaveId,
        /// Owner of both leaves.
        user_id: String,
        /// Dates covered by the conflicting leave.
        range: DateRange,
    },
}

impl DomainError {
    /// Returns true for [`DomainError::OverlapConflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::OverlapConflict { .. })
    }

    /// The rule description without the variant prefix, for chat messages.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::InvalidArgument(reason) | Self::InvalidState(reason) => reason.clone(),
            Self::OverlapConflict { range, .. } => {
                format!("You already have leave booked for {range}")
            }
        }
    }
}
