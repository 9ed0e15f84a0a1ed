//! `PostgreSQL` leave store.
//!
//! Queries are built at runtime so the crate compiles without a database
//! reachable at build time.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use leavedesk_core::{DateRange, Leave, LeaveId, SourceRef};

use super::{LeaveStore, LeaveTransaction, RepositoryError};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `leaves` queries.
#[derive(Debug, sqlx::FromRow)]
struct LeaveRow {
    id: LeaveId,
    user_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    leave_type: String,
    status: String,
    duration: String,
    reason: Option<String>,
}

impl LeaveRow {
    fn into_leave(self, sources: BTreeSet<SourceRef>) -> Result<Leave, RepositoryError> {
        let id = self.id;
        let corrupt = move |e: leavedesk_core::ParseEnumError| {
            RepositoryError::DataCorruption(format!("leave {id}: {e}"))
        };

        Ok(Leave {
            id: Some(id),
            range: DateRange::new(self.start_date, self.end_date),
            leave_type: self.leave_type.parse().map_err(corrupt)?,
            status: self.status.parse().map_err(corrupt)?,
            duration: self.duration.parse().map_err(corrupt)?,
            user_id: self.user_id,
            reason: self.reason,
            sources,
        })
    }
}

/// Internal row type for `leave_source_refs` queries.
#[derive(Debug, sqlx::FromRow)]
struct SourceRefRow {
    leave_id: LeaveId,
    source_system: String,
    external_id: String,
}

/// Load the source references of `rows` and assemble the leaves.
async fn attach_sources(
    conn: &mut PgConnection,
    rows: Vec<LeaveRow>,
) -> Result<Vec<Leave>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<LeaveId> = rows.iter().map(|row| row.id).collect();
    let refs: Vec<SourceRefRow> = sqlx::query_as(
        r"
        SELECT leave_id, source_system, external_id
        FROM leave_source_refs
        WHERE leave_id = ANY($1)
        ",
    )
    .bind(ids.as_slice())
    .fetch_all(&mut *conn)
    .await?;

    let mut by_leave: HashMap<LeaveId, BTreeSet<SourceRef>> = HashMap::new();
    for r in refs {
        by_leave
            .entry(r.leave_id)
            .or_default()
            .insert(SourceRef::new(r.source_system, r.external_id));
    }

    rows.into_iter()
        .map(|row| {
            let sources = by_leave.remove(&row.id).unwrap_or_default();
            row.into_leave(sources)
        })
        .collect()
}

async fn fetch_by_id(
    conn: &mut PgConnection,
    id: LeaveId,
) -> Result<Option<Leave>, RepositoryError> {
    let row: Option<LeaveRow> = sqlx::query_as(
        r"
        SELECT id, user_id, start_date, end_date, leave_type, status, duration, reason
        FROM leaves
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(attach_sources(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Leave store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgLeaveStore {
    pool: PgPool,
}

impl PgLeaveStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveStore for PgLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLeaveTransaction { tx }))
    }

    async fn find_by_id(&self, id: LeaveId) -> Result<Option<Leave>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgLeaveTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LeaveTransaction for PgLeaveTransaction {
    async fn lock_user(&mut self, user_id: &str) -> Result<(), RepositoryError> {
        // Released automatically at commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn save(&mut self, mut leave: Leave) -> Result<Leave, RepositoryError> {
        let id: LeaveId = match leave.id {
            None => {
                sqlx::query_scalar(
                    r"
                    INSERT INTO leaves
                        (user_id, start_date, end_date, leave_type, status, duration, reason)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id
                    ",
                )
                .bind(&leave.user_id)
                .bind(leave.range.start)
                .bind(leave.range.end)
                .bind(leave.leave_type.as_str())
                .bind(leave.status.as_str())
                .bind(leave.duration.as_str())
                .bind(&leave.reason)
                .fetch_one(&mut *self.tx)
                .await?
            }
            Some(id) => {
                let result = sqlx::query(
                    r"
                    UPDATE leaves
                    SET user_id = $2, start_date = $3, end_date = $4, leave_type = $5,
                        status = $6, duration = $7, reason = $8, updated_at = now()
                    WHERE id = $1
                    ",
                )
                .bind(id)
                .bind(&leave.user_id)
                .bind(leave.range.start)
                .bind(leave.range.end)
                .bind(leave.leave_type.as_str())
                .bind(leave.status.as_str())
                .bind(leave.duration.as_str())
                .bind(&leave.reason)
                .execute(&mut *self.tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound);
                }
                id
            }
        };

        for source in &leave.sources {
            // The no-op update makes RETURNING report the existing owner.
            let owner: LeaveId = sqlx::query_scalar(
                r"
                INSERT INTO leave_source_refs (leave_id, source_system, external_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (source_system, external_id)
                DO UPDATE SET leave_id = leave_source_refs.leave_id
                RETURNING leave_id
                ",
            )
            .bind(id)
            .bind(&source.system)
            .bind(&source.external_id)
            .fetch_one(&mut *self.tx)
            .await?;

            if owner != id {
                return Err(RepositoryError::Conflict(format!(
                    "source {source} belongs to leave {owner}"
                )));
            }
        }

        leave.id = Some(id);
        Ok(leave)
    }

    async fn find_overlapping(
        &mut self,
        user_id: &str,
        range: &DateRange,
        exclude: Option<LeaveId>,
    ) -> Result<Vec<Leave>, RepositoryError> {
        let rows: Vec<LeaveRow> = sqlx::query_as(
            r"
            SELECT id, user_id, start_date, end_date, leave_type, status, duration, reason
            FROM leaves
            WHERE user_id = $1
              AND start_date <= $3
              AND $2 <= end_date
              AND ($4::BIGINT IS NULL OR id <> $4)
            ORDER BY start_date, id
            ",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .bind(exclude)
        .fetch_all(&mut *self.tx)
        .await?;

        attach_sources(&mut self.tx, rows).await
    }

    async fn find_by_source_ref(
        &mut self,
        source: &SourceRef,
    ) -> Result<Option<Leave>, RepositoryError> {
        let leave_id: Option<LeaveId> = sqlx::query_scalar(
            r"
            SELECT leave_id
            FROM leave_source_refs
            WHERE source_system = $1 AND external_id = $2
            ",
        )
        .bind(&source.system)
        .bind(&source.external_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match leave_id {
            Some(id) => fetch_by_id(&mut self.tx, id).await,
            None => Ok(None),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
