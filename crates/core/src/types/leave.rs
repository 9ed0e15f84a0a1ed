//! Leave records and their enumerations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::date_range::DateRange;
use super::id::LeaveId;
use super::source::SourceRef;

/// Error returned when parsing one of the leave enums from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Defines the string forms shared by serde, `Display`, `FromStr` and the
/// database columns for a leave enum.
macro_rules! leave_enum_strings {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal, $label:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire and storage representation (e.g. `FULL_DAY`).
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Human-readable label for chat messages.
            #[must_use]
            pub const fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Category of leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Vacation,
    Sick,
    Personal,
    Parental,
    Unpaid,
    Other,
}

leave_enum_strings!(LeaveType, "leave type", {
    Vacation => "VACATION", "Vacation",
    Sick => "SICK", "Sick leave",
    Personal => "PERSONAL", "Personal",
    Parental => "PARENTAL", "Parental leave",
    Unpaid => "UNPAID", "Unpaid leave",
    Other => "OTHER", "Other",
});

/// Approval status of a leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
    Cancelled,
}

leave_enum_strings!(LeaveStatus, "leave status", {
    Requested => "REQUESTED", "Requested",
    Approved => "APPROVED", "Approved",
    Rejected => "REJECTED", "Rejected",
    Cancelled => "CANCELLED", "Cancelled",
});

/// How much of each day the leave covers.
///
/// Half-day markers are only meaningful for single-day leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveDuration {
    #[default]
    FullDay,
    FirstHalf,
    SecondHalf,
}

leave_enum_strings!(LeaveDuration, "leave duration", {
    FullDay => "FULL_DAY", "Full day",
    FirstHalf => "FIRST_HALF", "First half",
    SecondHalf => "SECOND_HALF", "Second half",
});

impl LeaveDuration {
    /// Returns true for the half-day markers.
    #[must_use]
    pub const fn is_half_day(&self) -> bool {
        matches!(self, Self::FirstHalf | Self::SecondHalf)
    }
}

/// A user's requested absence over a date range.
///
/// `id` is `None` until the leave has been persisted. Once stored, a leave is
/// only changed by re-ingesting a request under one of its source references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leave {
    /// Store-assigned identity.
    pub id: Option<LeaveId>,
    /// Owning user (Slack user ID or API-supplied identifier).
    pub user_id: String,
    /// Days covered by the leave.
    pub range: DateRange,
    /// Category.
    pub leave_type: LeaveType,
    /// Approval status.
    pub status: LeaveStatus,
    /// Full or half day.
    pub duration: LeaveDuration,
    /// Optional free-text reason supplied by the requester.
    pub reason: Option<String>,
    /// Records this leave was ingested from.
    pub sources: BTreeSet<SourceRef>,
}

impl Leave {
    /// Create an unsaved leave with a single source reference.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        range: DateRange,
        leave_type: LeaveType,
        duration: LeaveDuration,
        source: SourceRef,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            range,
            leave_type,
            status: LeaveStatus::default(),
            duration,
            reason: None,
            sources: BTreeSet::from([source]),
        }
    }

    /// Returns true once the leave has a store-assigned ID.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Returns true if the leave was ingested from `source`.
    #[must_use]
    pub fn has_source(&self, source: &SourceRef) -> bool {
        self.sources.contains(source)
    }

    /// Length of the leave in days, counting half days as 0.5.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Leave lengths are far below f64 precision limits
    pub fn length_in_days(&self) -> f64 {
        if self.duration.is_half_day() {
            0.5
        } else {
            self.range.day_count() as f64
        }
    }
}
