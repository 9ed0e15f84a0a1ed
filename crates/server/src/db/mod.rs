//! Leave storage.
//!
//! Two backends implement [`LeaveStore`]:
//!
//! - [`PgLeaveStore`] - `PostgreSQL`, used when `DATABASE_URL` is set
//! - [`MemoryLeaveStore`] - process-local, used for development and tests
//!
//! ## Tables
//!
//! - `leaves` - One row per leave
//! - `leave_source_refs` - Source references, unique per `(source_system, external_id)`
//!
//! # Transactions
//!
//! Ingestion reads and writes inside one [`LeaveTransaction`]. After
//! [`LeaveTransaction::lock_user`] returns, no other transaction can insert
//! or move a leave for that user until this one commits or is dropped, so
//! the overlap check and the write see the same data. Dropping a transaction
//! without committing rolls it back.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p leavedesk-cli -- migrate
//! ```

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use leavedesk_core::{DateRange, Leave, LeaveId, SourceRef};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryLeaveStore;
pub use postgres::PgLeaveStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a source reference owned by another leave).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// A store of leaves.
#[async_trait]
pub trait LeaveStore: Send + Sync {
    /// Start a transaction.
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, RepositoryError>;

    /// Fetch one leave outside any transaction.
    async fn find_by_id(&self, id: LeaveId) -> Result<Option<Leave>, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// An open storage transaction.
#[async_trait]
pub trait LeaveTransaction: Send {
    /// Serialize writers for `user_id` until the transaction ends.
    async fn lock_user(&mut self, user_id: &str) -> Result<(), RepositoryError>;

    /// Insert `leave` when it has no ID, update it otherwise.
    ///
    /// Returns the stored leave with its ID assigned.
    async fn save(&mut self, leave: Leave) -> Result<Leave, RepositoryError>;

    /// Leaves of `user_id` sharing at least one day with `range`, ordered by
    /// start date then ID, leaving out `exclude`.
    async fn find_overlapping(
        &mut self,
        user_id: &str,
        range: &DateRange,
        exclude: Option<LeaveId>,
    ) -> Result<Vec<Leave>, RepositoryError>;

    /// The leave owning `source`, if any.
    async fn find_by_source_ref(
        &mut self,
        source: &SourceRef,
    ) -> Result<Option<Leave>, RepositoryError>;

    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
