//! Row mapping and queries for stock exceptions.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgExecutor, QueryBuilder, Row};

use crate::error::{AppError, AppResult};

use super::models::{ExceptionFilter, NewStockException, StockException};

fn row_to_exception(row: &PgRow) -> AppResult<StockException> {
    let order_numbers: serde_json::Value = row.get("order_numbers");
    let order_numbers: Vec<String> = serde_json::from_value(order_numbers)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad order_numbers snapshot: {e}")))?;

    Ok(StockException {
        id: row.get("id"),
        sku: row.get("sku"),
        product_title: row.get("product_title"),
        category: row.get("category"),
        vendor_name: row.get("vendor_name"),
        qty_short: row.get("qty_short"),
        order_numbers,
        reported_by: row.get("reported_by"),
        created_at: row.get("created_at"),
        resolved: row.get("resolved"),
        ordered_from_company: row.get("ordered_from_company"),
        na_cancel: row.get("na_cancel"),
    })
}

/// Insert a snapshot row; called from the picking transaction.
pub async fn insert(conn: &mut PgConnection, new: &NewStockException) -> AppResult<i64> {
    let order_numbers = serde_json::to_value(&new.order_numbers)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize order_numbers: {e}")))?;

    let row = sqlx::query(
        "INSERT INTO stock_exceptions_tb
             (sku, product_title, category, vendor_name, qty_short, order_numbers, reported_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(&new.sku)
    .bind(&new.product_title)
    .bind(&new.category)
    .bind(&new.vendor_name)
    .bind(new.qty_short)
    .bind(order_numbers)
    .bind(&new.reported_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.get("id"))
}

pub async fn get(executor: impl PgExecutor<'_>, id: i64) -> AppResult<Option<StockException>> {
    let row = sqlx::query("SELECT * FROM stock_exceptions_tb WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(row_to_exception).transpose()
}

pub async fn list(
    executor: impl PgExecutor<'_>,
    filter: &ExceptionFilter,
) -> AppResult<Vec<StockException>> {
    let mut qb = QueryBuilder::new("SELECT * FROM stock_exceptions_tb WHERE 1=1");

    if let Some(resolved) = filter.resolved {
        qb.push(" AND resolved = ").push_bind(resolved);
    }
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (sku ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR product_title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR vendor_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR order_numbers::TEXT ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    // Sort column/direction come from fixed enums, never from raw input.
    qb.push(format!(
        " ORDER BY {} {}, id DESC",
        filter.sort.column(),
        filter.dir.keyword()
    ));

    let rows = qb.build().fetch_all(executor).await?;
    rows.iter().map(row_to_exception).collect()
}

/// Flip one boolean column; returns the updated row.
pub async fn set_flag(
    executor: impl PgExecutor<'_>,
    id: i64,
    column: &'static str,
    value: bool,
) -> AppResult<u64> {
    // column is compile-time constant ("resolved" | "ordered_from_company" | "na_cancel")
    let result = sqlx::query(&format!(
        "UPDATE stock_exceptions_tb SET {column} = $1 WHERE id = $2"
    ))
    .bind(value)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
