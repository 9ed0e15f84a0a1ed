//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use leavedesk_core::DomainError;

use crate::db::RepositoryError;
use crate::services::{IngestionError, InteractionError};
use crate::slack::{MetadataError, PayloadError, SignatureError, SlackError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Webhook signature or timestamp rejected.
    #[error("Authentication failed: {0}")]
    Signature(#[from] SignatureError),

    /// Webhook body could not be decoded.
    #[error("Malformed payload: {0}")]
    Payload(#[from] PayloadError),

    /// Correlation state could not be decoded.
    #[error("Invalid interaction state: {0}")]
    Metadata(#[from] MetadataError),

    /// A leave broke a domain rule or overlaps another leave.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Slack API operation failed.
    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Domain(e) => Self::Domain(e),
            IngestionError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<InteractionError> for AppError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::Metadata(e) => Self::Metadata(e),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Signature(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Payload(_) | Self::Metadata(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Domain(DomainError::OverlapConflict { .. }) => StatusCode::CONFLICT,
            Self::Domain(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Slack(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_) | Self::Slack(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Slack(_) => "External service error".to_string(),
            Self::Signature(_) => "Invalid request signature".to_string(),
            _ => self.to_string(),
        };

        let mut body = json!({ "error": message });
        if let Self::Domain(DomainError::OverlapConflict {
            conflicting_leave_id,
            range,
            ..
        }) = &self
        {
            body["conflictingLeaveId"] = json!(conflicting_leave_id);
            body["conflictingRange"] = json!(range);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use leavedesk_core::{DateRange, LeaveId};

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("leave 12".to_string());
        assert_eq!(err.to_string(), "Not found: leave 12");

        let err = AppError::Domain(DomainError::InvalidArgument("User ID is required".to_string()));
        assert_eq!(err.to_string(), "Invalid argument: User ID is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Signature(SignatureError::SignatureMismatch)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Payload(PayloadError::MissingTypeField)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Metadata(MetadataError::InvalidState(
                "metadata is empty".to_string()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Domain(DomainError::InvalidState(
                "Start date must be on or before end date".to_string()
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Slack(SlackError::Api("channel_not_found".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err: AppError = IngestionError::Domain(DomainError::OverlapConflict {
            conflicting_leave_id: LeaveId::new(3),
            user_id: "U1".to_string(),
            range: DateRange::single_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        })
        .into();
        assert_eq!(get_status(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_repository_error_maps_to_500() {
        let err: AppError = IngestionError::Repository(RepositoryError::NotFound).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
