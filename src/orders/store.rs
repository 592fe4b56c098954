//! Row mapping and queries for orders and order lines.

use anyhow::anyhow;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

use super::models::{LineProgress, Order, OrderLine, OrderStatus};

pub(crate) fn row_to_order(row: &PgRow) -> AppResult<Order> {
    let status_str: String = row.get("status");
    let status = OrderStatus::parse(&status_str)
        .ok_or_else(|| AppError::Internal(anyhow!("invalid order status in db: {status_str}")))?;

    Ok(Order {
        id: row.get("id"),
        external_id: row.get("external_id"),
        number: row.get("number"),
        customer_name: row.get("customer_name"),
        status,
        ready_to_pack: row.get("ready_to_pack"),
        total_shipments: row.get("total_shipments"),
        current_shipment: row.get("current_shipment"),
        customer_message: row.get("customer_message"),
        email_sent: row.get("email_sent"),
        packed_at: row.get("packed_at"),
        packed_by: row.get("packed_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_line(row: &PgRow) -> OrderLine {
    OrderLine {
        id: row.get("id"),
        order_id: row.get("order_id"),
        product_id: row.get("product_id"),
        qty_ordered: row.get("qty_ordered"),
        qty_picked: row.get("qty_picked"),
        qty_short: row.get("qty_short"),
        shipment_batch: row.get("shipment_batch"),
    }
}

const ORDER_COLS: &str = "id, external_id, number, customer_name, status, ready_to_pack, \
     total_shipments, current_shipment, customer_message, email_sent, \
     packed_at, packed_by, created_at, updated_at";

pub async fn get(executor: impl PgExecutor<'_>, id: i64) -> AppResult<Option<Order>> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLS} FROM orders_tb WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(row_to_order).transpose()
}

/// Lock the order row for the remainder of the transaction.
pub async fn get_for_update(executor: impl PgExecutor<'_>, id: i64) -> AppResult<Option<Order>> {
    let row = sqlx::query(&format!(
        "SELECT {ORDER_COLS} FROM orders_tb WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.as_ref().map(row_to_order).transpose()
}

pub async fn lines(executor: impl PgExecutor<'_>, order_id: i64) -> AppResult<Vec<OrderLine>> {
    let rows = sqlx::query(
        "SELECT id, order_id, product_id, qty_ordered, qty_picked, qty_short, shipment_batch
         FROM order_lines_tb WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.iter().map(row_to_line).collect())
}

/// Line progress for one shipment batch, the derivation input.
pub async fn batch_progress(
    executor: impl PgExecutor<'_>,
    order_id: i64,
    shipment_batch: i32,
) -> AppResult<Vec<LineProgress>> {
    let rows = sqlx::query(
        "SELECT qty_ordered, qty_picked, qty_short
         FROM order_lines_tb WHERE order_id = $1 AND shipment_batch = $2",
    )
    .bind(order_id)
    .bind(shipment_batch)
    .fetch_all(executor)
    .await?;
    Ok(rows
        .iter()
        .map(|r| LineProgress {
            qty_ordered: r.get("qty_ordered"),
            qty_picked: r.get("qty_picked"),
            qty_short: r.get("qty_short"),
        })
        .collect())
}

pub async fn apply_derived(
    executor: impl PgExecutor<'_>,
    order_id: i64,
    status: OrderStatus,
    ready_to_pack: bool,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE orders_tb SET status = $1, ready_to_pack = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(status.as_str())
    .bind(ready_to_pack)
    .bind(order_id)
    .execute(executor)
    .await?;
    Ok(())
}

// ============================================================================
// Status boards
// ============================================================================

/// Open + picking orders, oldest first (the floor works the queue FIFO).
pub async fn list_active(executor: impl PgExecutor<'_>) -> AppResult<Vec<Order>> {
    let rows = sqlx::query(&format!(
        "SELECT {ORDER_COLS} FROM orders_tb
         WHERE status IN ('open', 'picking')
         ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(executor)
    .await?;
    rows.iter().map(row_to_order).collect()
}

pub async fn list_ready_to_pack(executor: impl PgExecutor<'_>) -> AppResult<Vec<Order>> {
    let rows = sqlx::query(&format!(
        "SELECT {ORDER_COLS} FROM orders_tb
         WHERE status = 'ready_to_pack'
         ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(executor)
    .await?;
    rows.iter().map(row_to_order).collect()
}

/// Packed orders, newest first, paged.
pub async fn list_packed(
    executor: impl PgExecutor<'_>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Order>> {
    let rows = sqlx::query(&format!(
        "SELECT {ORDER_COLS} FROM orders_tb
         WHERE status = 'packed'
         ORDER BY packed_at DESC NULLS LAST, id DESC
         LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;
    rows.iter().map(row_to_order).collect()
}

/// One order line joined with its product, for the order detail view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LineDetail {
    pub id: i64,
    pub product_id: i64,
    pub sku: String,
    pub title: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub image_url: Option<String>,
    pub qty_ordered: i32,
    pub qty_picked: i32,
    pub qty_short: i32,
    pub shipment_batch: i32,
}

pub async fn line_details(
    executor: impl PgExecutor<'_>,
    order_id: i64,
) -> AppResult<Vec<LineDetail>> {
    let rows = sqlx::query(
        "SELECT l.id, l.product_id, p.sku, p.title, p.category, p.subcategory, p.image_url,
                l.qty_ordered, l.qty_picked, l.qty_short, l.shipment_batch
         FROM order_lines_tb l
         JOIN products_tb p ON p.id = l.product_id
         WHERE l.order_id = $1
         ORDER BY l.id",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;
    Ok(rows
        .iter()
        .map(|r| LineDetail {
            id: r.get("id"),
            product_id: r.get("product_id"),
            sku: r.get("sku"),
            title: r.get("title"),
            category: r.get("category"),
            subcategory: r.get("subcategory"),
            image_url: r.get("image_url"),
            qty_ordered: r.get("qty_ordered"),
            qty_picked: r.get("qty_picked"),
            qty_short: r.get("qty_short"),
            shipment_batch: r.get("shipment_batch"),
        })
        .collect())
}
