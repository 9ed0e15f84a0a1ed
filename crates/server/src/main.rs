//! Leavedesk - Slack leave-request bot.
//!
//! Serves the Slack webhooks, the leave API and health checks.
//!
//! # Storage
//!
//! With `DATABASE_URL` set, leaves are stored in `PostgreSQL`. Without it
//! the server runs on an in-memory store that is lost on restart.
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p leavedesk-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leavedesk_server::config::AppConfig;
use leavedesk_server::db::{self, LeaveStore, MemoryLeaveStore, PgLeaveStore};
use leavedesk_server::services::{LoggingSync, TaskDispatcher};
use leavedesk_server::slack::{SignatureVerifier, SlackClient};
use leavedesk_server::state::AppState;

/// How long queued Slack work may run after the listener stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Select the leave store from configuration.
async fn create_store(config: &AppConfig) -> Arc<dyn LeaveStore> {
    if let Some(database_url) = &config.database_url {
        let pool = db::create_pool(database_url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Database pool created");
        Arc::new(PgLeaveStore::new(pool))
    } else {
        tracing::warn!("DATABASE_URL not set, leaves are kept in memory only");
        Arc::new(MemoryLeaveStore::new())
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "leavedesk=info,leavedesk_server=info,tower_http=debug".into()
    });

    // JSON for log shippers, text for local development
    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let store = create_store(&config).await;
    let slack = Arc::new(SlackClient::new(config.slack.bot_token.clone()));
    let verifier = SignatureVerifier::new(config.slack.signing_secret.clone())
        .with_tolerance(config.slack.timestamp_tolerance);
    let dispatcher = TaskDispatcher::new(config.dispatch.workers, config.dispatch.queue_capacity);

    if config.api_token.is_none() {
        tracing::info!("LEAVEDESK_API_TOKEN not set, leave API disabled");
    }

    let state = AppState::new(
        verifier,
        store,
        slack,
        Arc::new(LoggingSync),
        dispatcher.clone(),
        config.api_token.clone(),
    );

    let app = leavedesk_server::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("leavedesk listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    let pending = dispatcher.in_flight();
    if pending > 0 {
        tracing::info!(pending, "Waiting for background Slack work to finish");
    }
    if tokio::time::timeout(DRAIN_TIMEOUT, dispatcher.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            pending = dispatcher.in_flight(),
            "Background work still running at shutdown"
        );
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
