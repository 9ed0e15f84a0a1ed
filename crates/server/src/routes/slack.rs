//! Slack webhook handlers.
//!
//! Every request is authenticated against the raw body before anything is
//! decoded. Slack only needs a quick `200 OK`; outcomes are posted to the
//! conversation later.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use tracing::instrument;

use crate::error::AppError;
use crate::slack::{
    InteractionEvent, SIGNATURE_HEADER, TIMESTAMP_HEADER, decode_interaction,
    decode_slash_command,
};
use crate::state::AppState;

/// Create Slack webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slack/commands", post(handle_command))
        .route("/slack/interactions", post(handle_interaction))
}

/// Check the Slack signature headers against the raw body.
fn verify_request(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    state
        .verifier()
        .verify(header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER), body)?;
    Ok(())
}

/// Handle the `/leave` slash command.
#[instrument(skip(state, headers, body))]
async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    verify_request(&state, &headers, &body)?;
    let command = decode_slash_command(&body)?;
    state
        .interactions()
        .handle(InteractionEvent::SlashCommand(command))
        .await?;
    Ok(StatusCode::OK)
}

/// Handle interactive callbacks (modal submission and close, block actions).
#[instrument(skip(state, headers, body))]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    verify_request(&state, &headers, &body)?;
    let event = decode_interaction(&body)?;
    state.interactions().handle(event).await?;
    Ok(StatusCode::OK)
}
