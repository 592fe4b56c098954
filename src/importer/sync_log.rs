//! Sync-log rows: one per import run, created before the fetch so
//! concurrent observers can see the in-flight sync.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// An `in_progress` row older than this is considered abandoned (the
/// process died mid-sync) and no longer blocks new runs.
pub const STALE_AFTER_MINUTES: i32 = 30;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncLog {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub orders_fetched: i32,
    pub orders_created: i32,
    pub orders_updated: i32,
    pub products_created: i32,
    pub products_updated: i32,
    pub items_created: i32,
    pub items_updated: i32,
    pub warnings: i32,
    pub error_message: Option<String>,
}

fn row_to_log(row: &PgRow) -> SyncLog {
    SyncLog {
        id: row.get("id"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        status: row.get("status"),
        orders_fetched: row.get("orders_fetched"),
        orders_created: row.get("orders_created"),
        orders_updated: row.get("orders_updated"),
        products_created: row.get("products_created"),
        products_updated: row.get("products_updated"),
        items_created: row.get("items_created"),
        items_updated: row.get("items_updated"),
        warnings: row.get("warnings"),
        error_message: row.get("error_message"),
    }
}

/// Finalize abandoned runs, then open a new `in_progress` row. The
/// guarded insert is the advisory single-flight check: it returns no row
/// when a live sync already holds the slot.
pub async fn begin(executor: impl PgExecutor<'_> + Copy) -> AppResult<i64> {
    sqlx::query(&format!(
        "UPDATE sync_logs_tb
         SET status = 'error', completed_at = NOW(),
             error_message = 'abandoned: process exited mid-sync'
         WHERE status = 'in_progress'
           AND started_at < NOW() - INTERVAL '{STALE_AFTER_MINUTES} minutes'"
    ))
    .execute(executor)
    .await?;

    let row = sqlx::query(
        "INSERT INTO sync_logs_tb (status)
         SELECT 'in_progress'
         WHERE NOT EXISTS (
             SELECT 1 FROM sync_logs_tb WHERE status = 'in_progress'
         )
         RETURNING id",
    )
    .fetch_optional(executor)
    .await?;

    match row {
        Some(r) => Ok(r.get("id")),
        None => Err(AppError::SyncBusy),
    }
}

pub async fn finish_success(
    executor: impl PgExecutor<'_>,
    id: i64,
    counters: &super::engine::SyncReport,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE sync_logs_tb
         SET status = 'success', completed_at = NOW(),
             orders_fetched = $1, orders_created = $2, orders_updated = $3,
             products_created = $4, products_updated = $5,
             items_created = $6, items_updated = $7, warnings = $8
         WHERE id = $9",
    )
    .bind(counters.orders_fetched)
    .bind(counters.orders_created)
    .bind(counters.orders_updated)
    .bind(counters.products_created)
    .bind(counters.products_updated)
    .bind(counters.items_created)
    .bind(counters.items_updated)
    .bind(counters.warnings)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn finish_error(
    executor: impl PgExecutor<'_>,
    id: i64,
    message: &str,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE sync_logs_tb
         SET status = 'error', completed_at = NOW(), error_message = $1
         WHERE id = $2",
    )
    .bind(message)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Most recent run, for the status endpoint.
pub async fn latest(executor: impl PgExecutor<'_>) -> AppResult<Option<SyncLog>> {
    let row = sqlx::query("SELECT * FROM sync_logs_tb ORDER BY started_at DESC, id DESC LIMIT 1")
        .fetch_optional(executor)
        .await?;
    Ok(row.as_ref().map(row_to_log))
}
