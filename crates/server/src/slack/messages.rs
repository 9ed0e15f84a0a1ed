//! Slack message builders for the leave request conversation.
//!
//! Provides factory functions for building Block Kit messages for:
//! - The anchor message that starts a request thread
//! - Success summaries for recorded leaves
//! - Rejections (validation failures and overlap conflicts)
//! - Cancellation when the form is dismissed

use leavedesk_core::{DateRange, Leave, LeaveId};

use super::types::{Block, ContextElement, PlainText, Text};

/// Ephemeral reply sent when the leave form could not be opened.
pub const OPEN_FORM_FAILED_TEXT: &str =
    "Sorry, the leave request form could not be opened. Please run the command again.";

/// Build the anchor message posted when a user starts a leave request.
///
/// Every later outcome is posted as a reply in this message's thread.
#[must_use]
pub fn build_anchor_message(user_id: &str) -> Vec<Block> {
    vec![
        Block::Section {
            text: Text::mrkdwn(format!(
                ":calendar: <@{user_id}> is filing a leave request."
            )),
        },
        Block::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: "The outcome will be posted in this thread.".to_string(),
            }],
        },
    ]
}

/// Fallback text for the anchor message.
#[must_use]
pub fn anchor_text(user_id: &str) -> String {
    format!("<@{user_id}> is filing a leave request")
}

/// Build the summary posted after a leave was recorded.
#[must_use]
pub fn build_success_message(leave: &Leave) -> Vec<Block> {
    let id = leave
        .id
        .map_or_else(|| "pending".to_string(), |id| id.to_string());
    let days = leave.length_in_days();
    let day_word = if leave.range.is_single_day() {
        "day"
    } else {
        "days"
    };

    let mut details = format!(
        "*Type:* {}\n*Dates:* {}\n*Duration:* {} ({days} {day_word})\n*Status:* {}",
        leave.leave_type.label(),
        leave.range,
        leave.duration.label(),
        leave.status.label(),
    );
    if let Some(reason) = &leave.reason {
        details.push_str("\n*Reason:* ");
        details.push_str(reason);
    }

    vec![
        Block::Header {
            text: PlainText::new(":white_check_mark: Leave recorded"),
        },
        Block::Section {
            text: Text::mrkdwn(details),
        },
        Block::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: format!("Leave #{id} for <@{}>", leave.user_id),
            }],
        },
    ]
}

/// Fallback text for the success summary.
#[must_use]
pub fn success_text(leave: &Leave) -> String {
    format!("Leave recorded for {}", leave.range)
}

/// Build the message posted when a request was rejected.
#[must_use]
pub fn build_failure_message(reason: &str) -> Vec<Block> {
    vec![
        Block::Section {
            text: Text::mrkdwn(format!(
                ":x: *Your leave request could not be recorded.*\n{reason}"
            )),
        },
        Block::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: "Run the command again to submit a corrected request.".to_string(),
            }],
        },
    ]
}

/// Build the message posted when a request overlaps an existing leave.
#[must_use]
pub fn build_conflict_message(range: &DateRange, conflicting_leave_id: LeaveId) -> Vec<Block> {
    vec![
        Block::Section {
            text: Text::mrkdwn(format!(
                ":warning: *You already have leave booked for {range}.*"
            )),
        },
        Block::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: format!("Conflicts with leave #{conflicting_leave_id}"),
            }],
        },
    ]
}

/// Fallback text for rejections and conflicts.
#[must_use]
pub fn failure_text(reason: &str) -> String {
    format!("Leave request rejected: {reason}")
}

/// Build the message posted when the user dismissed the form.
#[must_use]
pub fn build_cancelled_message(user_id: &str) -> Vec<Block> {
    vec![Block::Context {
        elements: vec![ContextElement::Mrkdwn {
            text: format!(":no_entry_sign: <@{user_id}> cancelled the leave request."),
        }],
    }]
}

/// Fallback text for the cancellation message.
pub const CANCELLED_TEXT: &str = "Leave request cancelled";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use leavedesk_core::{LeaveDuration, LeaveType, SourceRef};

    fn sample_leave() -> Leave {
        let mut leave = Leave::new(
            "U1",
            DateRange::new(
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            ),
            LeaveType::Vacation,
            LeaveDuration::FullDay,
            SourceRef::slack_view("V1"),
        );
        leave.id = Some(LeaveId::new(42));
        leave
    }

    fn render(blocks: &[Block]) -> String {
        serde_json::to_string(blocks).unwrap()
    }

    #[test]
    fn test_anchor_mentions_user() {
        let json = render(&build_anchor_message("U123"));
        assert!(json.contains("<@U123>"));
        assert!(anchor_text("U123").contains("<@U123>"));
    }

    #[test]
    fn test_success_summary() {
        let leave = sample_leave();
        let json = render(&build_success_message(&leave));
        assert!(json.contains("Vacation"));
        assert!(json.contains("2024-03-01 to 2024-03-04"));
        assert!(json.contains("4 days"));
        assert!(json.contains("Leave #42"));
        assert!(!json.contains("Reason"));
    }

    #[test]
    fn test_success_summary_includes_reason() {
        let mut leave = sample_leave();
        leave.reason = Some("Family trip".to_string());
        let json = render(&build_success_message(&leave));
        assert!(json.contains("*Reason:* Family trip"));
    }

    #[test]
    fn test_conflict_names_period_and_leave() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        );
        let json = render(&build_conflict_message(&range, LeaveId::new(7)));
        assert!(json.contains("2024-01-01 to 2024-01-05"));
        assert!(json.contains("leave #7"));
    }

    #[test]
    fn test_failure_and_cancelled() {
        let json = render(&build_failure_message("Start date is required"));
        assert!(json.contains("Start date is required"));

        let json = render(&build_cancelled_message("U9"));
        assert!(json.contains("<@U9> cancelled"));
    }
}
