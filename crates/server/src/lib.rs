//! Leavedesk server library.
//!
//! Slack leave-request bot and leave ingestion API, exposed as a library so
//! the router and services can be driven from integration tests.
//!
//! # Flow
//!
//! 1. `/leave` posts an anchor message in the channel and opens the request
//!    modal, carrying the conversation in the view's private metadata
//! 2. The submitted modal is acknowledged immediately; ingestion runs on the
//!    [`services::TaskDispatcher`]
//! 3. The outcome (stored, rejected, overlapping) is posted as a reply in the
//!    anchor's thread

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod slack;
pub mod state;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the application router with request tracing.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
