//! Leave API handlers.
//!
//! A bearer-token JSON API for systems that file leaves without going
//! through Slack. Requests go through the same ingestion pipeline as modal
//! submissions, keyed by an `api` source reference.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use leavedesk_core::{
    DateRange, DomainError, Leave, LeaveDuration, LeaveId, LeaveStatus, LeaveType, SourceRef,
};

use crate::config::api_token_matches;
use crate::error::AppError;
use crate::services::LeaveIngestRequest;
use crate::state::AppState;

/// Create leave API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/leaves", post(create_leave))
        .route("/api/leaves/{id}", get(get_leave))
}

/// JSON body for `POST /api/leaves`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveRequest {
    pub user_id: String,
    pub start_date: NaiveDate,
    /// Defaults to `start_date`.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub leave_type: LeaveType,
    #[serde(default)]
    pub duration: LeaveDuration,
    #[serde(default)]
    pub status: LeaveStatus,
    #[serde(default)]
    pub reason: Option<String>,
    /// Caller's identifier for the record; re-posting it updates the leave.
    pub source_id: String,
}

impl TryFrom<CreateLeaveRequest> for LeaveIngestRequest {
    type Error = DomainError;

    fn try_from(req: CreateLeaveRequest) -> Result<Self, Self::Error> {
        let source_id = req.source_id.trim();
        if source_id.is_empty() {
            return Err(DomainError::InvalidArgument(
                "Source ID is required".to_string(),
            ));
        }

        Ok(Self {
            user_id: req.user_id,
            range: DateRange::starting(req.start_date, req.end_date),
            leave_type: req.leave_type,
            duration: req.duration,
            status: req.status,
            reason: req.reason.filter(|r| !r.trim().is_empty()),
            source: SourceRef::api(source_id),
        })
    }
}

/// Check the bearer token. The API is hidden entirely when no token is set.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.api_token() else {
        return Err(AppError::NotFound("Leave API is disabled".to_string()));
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if api_token_matches(expected, presented) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid bearer token".to_string()))
    }
}

/// Ingest a leave.
///
/// The body is parsed after authentication so unauthenticated callers learn
/// nothing about the expected shape.
#[instrument(skip(state, headers, body))]
async fn create_leave(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Leave>), AppError> {
    authorize(&state, &headers)?;

    let request: CreateLeaveRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid leave request: {e}")))?;
    let request = LeaveIngestRequest::try_from(request)?;

    let leave = state.ingestion().ingest(request).await?;
    Ok((StatusCode::CREATED, Json(leave)))
}

/// Fetch a stored leave by ID.
#[instrument(skip(state, headers))]
async fn get_leave(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Leave>, AppError> {
    authorize(&state, &headers)?;

    state
        .store()
        .find_by_id(LeaveId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("leave {id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CreateLeaveRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_minimal_request_uses_defaults() {
        let req = parse(
            r#"{"userId":"U1","startDate":"2024-03-04","leaveType":"SICK","sourceId":"hr-1"}"#,
        );
        let ingest = LeaveIngestRequest::try_from(req).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(ingest.range, DateRange::single_day(day));
        assert_eq!(ingest.duration, LeaveDuration::FullDay);
        assert_eq!(ingest.status, LeaveStatus::Requested);
        assert_eq!(ingest.source, SourceRef::api("hr-1"));
        assert!(ingest.reason.is_none());
    }

    #[test]
    fn test_full_request() {
        let req = parse(
            r#"{"userId":"U1","startDate":"2024-03-04","endDate":"2024-03-08",
                "leaveType":"VACATION","duration":"FULL_DAY","status":"APPROVED",
                "reason":"Trip","sourceId":"hr-2"}"#,
        );
        let ingest = LeaveIngestRequest::try_from(req).unwrap();

        assert_eq!(ingest.range.day_count(), 5);
        assert_eq!(ingest.status, LeaveStatus::Approved);
        assert_eq!(ingest.reason.as_deref(), Some("Trip"));
    }

    #[test]
    fn test_blank_source_id_rejected() {
        let req = parse(
            r#"{"userId":"U1","startDate":"2024-03-04","leaveType":"SICK","sourceId":"  "}"#,
        );
        let err = LeaveIngestRequest::try_from(req).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_leave_type_fails_to_parse() {
        let result: Result<CreateLeaveRequest, _> = serde_json::from_str(
            r#"{"userId":"U1","startDate":"2024-03-04","leaveType":"NAP","sourceId":"x"}"#,
        );
        assert!(result.is_err());
    }
}
