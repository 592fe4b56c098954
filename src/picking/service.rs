//! Pick, short and revert over row-locked transactions, plus the
//! read-side views.
//!
//! Lock discipline: every mutation selects its candidate lines
//! `ORDER BY o.created_at ASC, o.id ASC ... FOR UPDATE OF l`. Two pickers
//! racing on overlapping SKUs therefore contend on the first shared row
//! and one of them wins the whole FIFO walk; the loser either completes
//! against what is left or fails with `InsufficientRemaining`. Partial
//! application is never visible.

use sqlx::{PgConnection, PgPool, Row};

use crate::error::{AppError, AppResult};
use crate::orders::service::derive_and_store;
use crate::shortage::models::NewStockException;
use crate::shortage::store as shortage_store;

use super::allocation::{LineSupply, plan_allocation};
use super::models::{
    PickAllocation, PickEventKind, PickResult, PickRow, PickedItemRow, RevertResult,
    ShortAllocation, ShortResult, SkuOrderRow,
};

/// Lines eligible for allocation: active order, current shipment batch,
/// demand left.
const ELIGIBLE_LINES_FOR_SKU: &str = r#"
SELECT l.id AS line_id, l.order_id, o.number,
       (l.qty_ordered - l.qty_picked - l.qty_short) AS remaining
FROM order_lines_tb l
JOIN orders_tb o ON o.id = l.order_id
JOIN products_tb p ON p.id = l.product_id
WHERE p.sku = $1
  AND o.status NOT IN ('packed', 'cancelled')
  AND l.shipment_batch = o.current_shipment
  AND l.qty_picked + l.qty_short < l.qty_ordered
ORDER BY o.created_at ASC, o.id ASC
FOR UPDATE OF l
"#;

#[derive(Clone)]
pub struct PickingService {
    pool: PgPool,
}

struct LockedLine {
    line_id: i64,
    order_id: i64,
    order_number: String,
    remaining: i32,
}

impl PickingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_eligible_lines(
        conn: &mut PgConnection,
        sku: &str,
    ) -> AppResult<Vec<LockedLine>> {
        let rows = sqlx::query(ELIGIBLE_LINES_FOR_SKU)
            .bind(sku)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows
            .iter()
            .map(|r| LockedLine {
                line_id: r.get("line_id"),
                order_id: r.get("order_id"),
                order_number: r.get("number"),
                remaining: r.get("remaining"),
            })
            .collect())
    }

    async fn append_event(
        conn: &mut PgConnection,
        line_id: i64,
        kind: PickEventKind,
        delta: i32,
        username: &str,
        notes: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO pick_events_tb (order_line_id, delta_qty, kind, username, notes)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(line_id)
        .bind(delta)
        .bind(kind.as_str())
        .bind(username)
        .bind(notes)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Distribute `qty` picked units of `sku` FIFO across order lines.
    pub async fn pick(
        &self,
        sku: &str,
        qty: i32,
        username: &str,
        notes: Option<&str>,
    ) -> AppResult<PickResult> {
        if qty <= 0 {
            return Err(AppError::Validation("pick qty must be positive".into()));
        }

        let mut tx = self.pool.begin().await?;
        let lines = Self::lock_eligible_lines(&mut tx, sku).await?;

        let supplies: Vec<LineSupply> = lines
            .iter()
            .map(|l| LineSupply {
                line_id: l.line_id,
                remaining: l.remaining,
            })
            .collect();

        let takes = plan_allocation(&supplies, qty).map_err(|e| {
            AppError::InsufficientRemaining {
                requested: e.requested,
                available: e.available,
            }
        })?;

        let mut allocations = Vec::with_capacity(takes.len());
        let mut touched_orders: Vec<i64> = Vec::new();

        for take in &takes {
            sqlx::query(
                "UPDATE order_lines_tb SET qty_picked = qty_picked + $1 WHERE id = $2",
            )
            .bind(take.qty)
            .bind(take.line_id)
            .execute(&mut *tx)
            .await?;
            Self::append_event(&mut tx, take.line_id, PickEventKind::Pick, take.qty, username, notes)
                .await?;

            let line = lines
                .iter()
                .find(|l| l.line_id == take.line_id)
                .expect("take came from locked lines");
            allocations.push(PickAllocation {
                line_id: take.line_id,
                order_id: line.order_id,
                order_number: line.order_number.clone(),
                qty: take.qty,
            });
            if !touched_orders.contains(&line.order_id) {
                touched_orders.push(line.order_id);
            }
        }

        // Re-derive in the same FIFO order the line locks were taken.
        for order_id in &touched_orders {
            derive_and_store(&mut tx, *order_id).await?;
        }

        tx.commit().await?;
        tracing::info!(sku, qty, user = username, orders = touched_orders.len(), "pick applied");
        Ok(PickResult {
            sku: sku.to_string(),
            qty,
            allocations,
        })
    }

    /// Record shortages against explicitly named orders and snapshot one
    /// stock exception covering the whole call.
    pub async fn mark_short(
        &self,
        sku: &str,
        allocations: &[ShortAllocation],
        username: &str,
        notes: Option<&str>,
    ) -> AppResult<ShortResult> {
        if allocations.is_empty() {
            return Err(AppError::Validation("no shortage allocations given".into()));
        }
        if allocations.iter().any(|a| a.qty_short <= 0) {
            return Err(AppError::Validation("qty_short must be positive".into()));
        }
        for (i, alloc) in allocations.iter().enumerate() {
            if allocations[..i].iter().any(|a| a.order_id == alloc.order_id) {
                return Err(AppError::Validation(format!(
                    "order {} appears more than once in the allocation",
                    alloc.order_id
                )));
            }
        }

        let mut tx = self.pool.begin().await?;

        // Lock every eligible line for the SKU in canonical order, then
        // match the operator's allocations against the locked set. This
        // keeps the lock order identical to `pick` regardless of the
        // order the allocations arrive in.
        let lines = Self::lock_eligible_lines(&mut tx, sku).await?;

        let mut total_short = 0i32;
        let mut order_numbers: Vec<String> = Vec::new();
        let mut touched_orders: Vec<i64> = Vec::new();

        for alloc in allocations {
            let line = lines
                .iter()
                .find(|l| l.order_id == alloc.order_id)
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "order {} has no open line for sku {}",
                        alloc.order_id, sku
                    ))
                })?;
            if alloc.qty_short > line.remaining {
                return Err(AppError::Validation(format!(
                    "short {} exceeds remaining {} on order {}",
                    alloc.qty_short, line.remaining, line.order_number
                )));
            }

            sqlx::query(
                "UPDATE order_lines_tb SET qty_short = qty_short + $1 WHERE id = $2",
            )
            .bind(alloc.qty_short)
            .bind(line.line_id)
            .execute(&mut *tx)
            .await?;
            Self::append_event(
                &mut tx,
                line.line_id,
                PickEventKind::Short,
                alloc.qty_short,
                username,
                notes,
            )
            .await?;

            total_short += alloc.qty_short;
            if !order_numbers.contains(&line.order_number) {
                order_numbers.push(line.order_number.clone());
            }
            if !touched_orders.contains(&line.order_id) {
                touched_orders.push(line.order_id);
            }
        }

        // Snapshot the product for the exception row.
        let product = sqlx::query(
            "SELECT title, category, vendor_name FROM products_tb WHERE sku = $1",
        )
        .bind(sku)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {sku}")))?;

        let exception_id = shortage_store::insert(
            &mut tx,
            &NewStockException {
                sku: sku.to_string(),
                product_title: product.get("title"),
                category: product.get("category"),
                vendor_name: product.get("vendor_name"),
                qty_short: total_short,
                order_numbers: order_numbers.clone(),
                reported_by: username.to_string(),
            },
        )
        .await?;

        for order_id in &touched_orders {
            derive_and_store(&mut tx, *order_id).await?;
        }

        tx.commit().await?;
        tracing::info!(sku, total_short, user = username, "shortage recorded");
        Ok(ShortResult {
            sku: sku.to_string(),
            total_short,
            order_numbers,
            stock_exception_id: exception_id,
        })
    }

    /// Undo picked units on one line. Omitted qty reverts everything.
    pub async fn revert_picked_item(
        &self,
        line_id: i64,
        qty: Option<i32>,
        username: &str,
        notes: Option<&str>,
    ) -> AppResult<RevertResult> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT l.id, l.order_id, l.qty_picked, o.status, o.number
             FROM order_lines_tb l
             JOIN orders_tb o ON o.id = l.order_id
             WHERE l.id = $1
             FOR UPDATE OF l",
        )
        .bind(line_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order line {line_id}")))?;

        let status: String = row.get("status");
        if status == "packed" || status == "cancelled" {
            return Err(AppError::InvalidTransition(format!(
                "order {} is {status}; picked items can no longer be reverted",
                row.get::<String, _>("number")
            )));
        }

        let qty_picked: i32 = row.get("qty_picked");
        let revert_qty = qty.unwrap_or(qty_picked);
        if revert_qty <= 0 {
            return Err(AppError::Validation("revert qty must be positive".into()));
        }
        if revert_qty > qty_picked {
            return Err(AppError::Validation(format!(
                "revert {revert_qty} exceeds picked {qty_picked}"
            )));
        }

        sqlx::query("UPDATE order_lines_tb SET qty_picked = qty_picked - $1 WHERE id = $2")
            .bind(revert_qty)
            .bind(line_id)
            .execute(&mut *tx)
            .await?;
        Self::append_event(
            &mut tx,
            line_id,
            PickEventKind::Revert,
            -revert_qty,
            username,
            notes,
        )
        .await?;

        let order_id: i64 = row.get("order_id");
        derive_and_store(&mut tx, order_id).await?;

        tx.commit().await?;
        tracing::info!(line_id, revert_qty, user = username, "pick reverted");
        Ok(RevertResult {
            line_id,
            order_id,
            qty_reverted: revert_qty,
            qty_picked: qty_picked - revert_qty,
        })
    }

    // ------------------------------------------------------------------
    // Read side (read-committed; aggregates may lag in-flight picks and
    // callers re-fetch after mutations)
    // ------------------------------------------------------------------

    pub async fn pick_list(&self) -> AppResult<Vec<PickRow>> {
        let rows = sqlx::query(
            r#"
            SELECT p.sku, p.title, p.category, p.subcategory, p.image_url,
                   SUM(l.qty_ordered)::BIGINT AS needed,
                   SUM(l.qty_picked)::BIGINT AS picked,
                   SUM(l.qty_short)::BIGINT AS short
            FROM order_lines_tb l
            JOIN orders_tb o ON o.id = l.order_id
            JOIN products_tb p ON p.id = l.product_id
            WHERE o.status NOT IN ('packed', 'cancelled')
              AND l.shipment_batch = o.current_shipment
            GROUP BY p.sku, p.title, p.category, p.subcategory, p.image_url
            HAVING SUM(l.qty_ordered) - SUM(l.qty_picked) - SUM(l.qty_short) > 0
            ORDER BY p.category, p.subcategory NULLS FIRST, p.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let needed: i64 = r.get("needed");
                let picked: i64 = r.get("picked");
                let short: i64 = r.get("short");
                PickRow {
                    sku: r.get("sku"),
                    title: r.get("title"),
                    category: r.get("category"),
                    subcategory: r.get("subcategory"),
                    image_url: r.get("image_url"),
                    needed,
                    picked,
                    short,
                    remaining: needed - picked - short,
                }
            })
            .collect())
    }

    /// The FIFO queue behind one pick row.
    pub async fn orders_for_sku(&self, sku: &str) -> AppResult<Vec<SkuOrderRow>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id AS line_id, o.id AS order_id, o.number, o.customer_name,
                   o.created_at, l.qty_ordered, l.qty_picked, l.qty_short
            FROM order_lines_tb l
            JOIN orders_tb o ON o.id = l.order_id
            JOIN products_tb p ON p.id = l.product_id
            WHERE p.sku = $1
              AND o.status NOT IN ('packed', 'cancelled')
              AND l.shipment_batch = o.current_shipment
            ORDER BY o.created_at ASC, o.id ASC
            "#,
        )
        .bind(sku)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let qty_ordered: i32 = r.get("qty_ordered");
                let qty_picked: i32 = r.get("qty_picked");
                let qty_short: i32 = r.get("qty_short");
                SkuOrderRow {
                    line_id: r.get("line_id"),
                    order_id: r.get("order_id"),
                    order_number: r.get("number"),
                    customer_name: r.get("customer_name"),
                    order_created_at: r.get("created_at"),
                    qty_ordered,
                    qty_picked,
                    qty_short,
                    remaining: qty_ordered - qty_picked - qty_short,
                }
            })
            .collect())
    }

    /// Lines with picked units on orders that have not shipped yet,
    /// most recently picked first.
    pub async fn picked_items(&self) -> AppResult<Vec<PickedItemRow>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id AS line_id, o.id AS order_id, o.number, o.customer_name,
                   p.sku, p.title, l.qty_ordered, l.qty_picked, l.qty_short,
                   (SELECT MAX(e.created_at) FROM pick_events_tb e
                     WHERE e.order_line_id = l.id AND e.kind = 'pick') AS last_picked_at
            FROM order_lines_tb l
            JOIN orders_tb o ON o.id = l.order_id
            JOIN products_tb p ON p.id = l.product_id
            WHERE o.status NOT IN ('packed', 'cancelled')
              AND l.qty_picked > 0
            ORDER BY last_picked_at DESC NULLS LAST, l.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| PickedItemRow {
                line_id: r.get("line_id"),
                order_id: r.get("order_id"),
                order_number: r.get("number"),
                customer_name: r.get("customer_name"),
                sku: r.get("sku"),
                title: r.get("title"),
                qty_ordered: r.get("qty_ordered"),
                qty_picked: r.get("qty_picked"),
                qty_short: r.get("qty_short"),
                last_picked_at: r.get("last_picked_at"),
            })
            .collect())
    }
}
