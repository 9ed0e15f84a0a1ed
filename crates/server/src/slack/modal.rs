//! The leave request modal: how it is built and how its submission is read.

use leavedesk_core::{DateRange, DomainError, LeaveDuration, LeaveType};

use super::error::MetadataError;
use super::metadata::InteractionMetadata;
use super::payload::{FieldValue, ViewState};
use super::types::{Block, InputElement, OptionObject, PlainText, Text, View};

/// Callback ID identifying leave request submissions.
pub const CALLBACK_ID: &str = "leave_request";

pub const LEAVE_TYPE_BLOCK: &str = "leave_type_block";
pub const LEAVE_TYPE_ACTION: &str = "leave_type";
pub const DURATION_BLOCK: &str = "duration_block";
pub const DURATION_ACTION: &str = "duration";
pub const START_DATE_BLOCK: &str = "start_date_block";
pub const START_DATE_ACTION: &str = "start_date";
pub const END_DATE_BLOCK: &str = "end_date_block";
pub const END_DATE_ACTION: &str = "end_date";
pub const REASON_BLOCK: &str = "reason_block";
pub const REASON_ACTION: &str = "reason";

/// Values read from a submitted leave request modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveForm {
    pub leave_type: LeaveType,
    pub duration: LeaveDuration,
    /// End defaults to start when no end date was picked.
    pub range: DateRange,
    pub reason: Option<String>,
}

/// Build the leave request modal, carrying `metadata` in `private_metadata`.
///
/// # Errors
///
/// Returns an error if the metadata cannot be encoded.
pub fn leave_request_view(metadata: &InteractionMetadata) -> Result<View, MetadataError> {
    let leave_types: Vec<OptionObject> = LeaveType::ALL
        .iter()
        .map(|t| OptionObject::new(t.label(), t.as_str()))
        .collect();
    let durations: Vec<OptionObject> = LeaveDuration::ALL
        .iter()
        .map(|d| OptionObject::new(d.label(), d.as_str()))
        .collect();

    Ok(View {
        view_type: "modal",
        callback_id: CALLBACK_ID.to_string(),
        title: PlainText::new("Request leave"),
        submit: PlainText::new("Submit"),
        close: PlainText::new("Cancel"),
        private_metadata: metadata.encode()?,
        notify_on_close: true,
        blocks: vec![
            Block::Section {
                text: Text::mrkdwn(format!(
                    "Requesting leave from <#{}>",
                    metadata.channel_id
                )),
            },
            Block::Input {
                block_id: LEAVE_TYPE_BLOCK.to_string(),
                label: PlainText::new("Leave type"),
                element: InputElement::RadioButtons {
                    action_id: LEAVE_TYPE_ACTION.to_string(),
                    options: leave_types,
                    initial_option: None,
                },
                optional: false,
            },
            Block::Input {
                block_id: DURATION_BLOCK.to_string(),
                label: PlainText::new("Duration"),
                element: InputElement::RadioButtons {
                    action_id: DURATION_ACTION.to_string(),
                    initial_option: durations.first().cloned(),
                    options: durations,
                },
                optional: false,
            },
            Block::Input {
                block_id: START_DATE_BLOCK.to_string(),
                label: PlainText::new("Start date"),
                element: InputElement::Datepicker {
                    action_id: START_DATE_ACTION.to_string(),
                    placeholder: Some(PlainText::new("First day of leave")),
                },
                optional: false,
            },
            Block::Input {
                block_id: END_DATE_BLOCK.to_string(),
                label: PlainText::new("End date"),
                element: InputElement::Datepicker {
                    action_id: END_DATE_ACTION.to_string(),
                    placeholder: Some(PlainText::new("Leave empty for a single day")),
                },
                optional: true,
            },
            Block::Input {
                block_id: REASON_BLOCK.to_string(),
                label: PlainText::new("Reason"),
                element: InputElement::PlainTextInput {
                    action_id: REASON_ACTION.to_string(),
                    multiline: true,
                    max_length: Some(leavedesk_core::validation::MAX_REASON_LENGTH),
                },
                optional: true,
            },
        ],
    })
}

/// Read the submitted values of a leave request modal.
///
/// # Errors
///
/// Returns `InvalidArgument` if the leave type or start date is missing, or
/// a selected option is not one this service offers.
pub fn read_leave_form(state: &ViewState) -> Result<LeaveForm, DomainError> {
    let leave_type = selected_option(state, LEAVE_TYPE_BLOCK, LEAVE_TYPE_ACTION)
        .ok_or_else(|| DomainError::InvalidArgument("Leave type is required".to_string()))?
        .parse::<LeaveType>()
        .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;

    let duration = selected_option(state, DURATION_BLOCK, DURATION_ACTION)
        .map(str::parse::<LeaveDuration>)
        .transpose()
        .map_err(|e| DomainError::InvalidArgument(e.to_string()))?
        .unwrap_or_default();

    let start = selected_date(state, START_DATE_BLOCK, START_DATE_ACTION)
        .ok_or_else(|| DomainError::InvalidArgument("Start date is required".to_string()))?;
    let end = selected_date(state, END_DATE_BLOCK, END_DATE_ACTION);

    let reason = match state.get(REASON_BLOCK, REASON_ACTION) {
        Some(FieldValue::PlainTextInput { value: Some(text) }) if !text.trim().is_empty() => {
            Some(text.trim().to_string())
        }
        _ => None,
    };

    Ok(LeaveForm {
        leave_type,
        duration,
        range: DateRange::starting(start, end),
        reason,
    })
}

fn selected_option<'a>(state: &'a ViewState, block: &str, action: &str) -> Option<&'a str> {
    match state.get(block, action)? {
        FieldValue::RadioButtons {
            selected_option: Some(option),
        } => Some(option.value.as_str()),
        _ => None,
    }
}

fn selected_date(state: &ViewState, block: &str, action: &str) -> Option<chrono::NaiveDate> {
    match state.get(block, action)? {
        FieldValue::Datepicker { selected_date } => *selected_date,
        _ => None,
    }
}
