//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store reachable)
//!
//! # Slack (signed webhooks)
//! POST /slack/commands         - Slash command
//! POST /slack/interactions     - Modal submissions, closes and block actions
//!
//! # Leave API (bearer token)
//! POST /api/leaves             - Ingest a leave
//! GET  /api/leaves/{id}        - Fetch a stored leave
//! ```

pub mod health;
pub mod leaves;
pub mod slack;

use axum::{Router, routing::get};

use crate::state::AppState;

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(slack::router())
        .merge(leaves::router())
}
