//! The sync engine: one run = fetch, flatten, upsert, auto-pack,
//! re-derive, book-keep.
//!
//! Per-item failures roll back their own savepoint, count a warning and
//! never abort the run; only a transport-level failure does. Two
//! back-to-back runs against identical upstream input produce no net
//! writes beyond `updated_at`.

use rustc_hash::FxHashMap;
use serde::Serialize;
use sqlx::{Acquire, PgConnection, PgPool, Row};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::catalog::types::{FlatOrder, FlatProduct};
use crate::catalog::{CatalogClient, flatten};
use crate::error::AppResult;
use crate::orders::service::derive_and_store;
use crate::settings::SettingsService;

use super::sync_log;

/// Counters for one sync run, mirrored into the sync-log row.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SyncReport {
    pub orders_fetched: i32,
    pub orders_created: i32,
    pub orders_updated: i32,
    pub products_created: i32,
    pub products_updated: i32,
    pub items_created: i32,
    pub items_updated: i32,
    pub warnings: i32,
}

/// Decision for an existing line when upstream shows a new `qty_ordered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QtyReconcile {
    /// Values agree; nothing to write.
    Unchanged,
    /// Safe to adopt the upstream quantity.
    Apply,
    /// Local progress exceeds the new quantity; keep ours, flag it.
    Conflict,
}

/// Adopt the upstream quantity unless local progress already exceeds it,
/// in which case an operator has to sort it out by hand.
pub(crate) fn reconcile_qty_ordered(
    current_ordered: i32,
    picked: i32,
    short: i32,
    new_ordered: i32,
) -> QtyReconcile {
    if new_ordered == current_ordered {
        QtyReconcile::Unchanged
    } else if picked + short <= new_ordered {
        QtyReconcile::Apply
    } else {
        QtyReconcile::Conflict
    }
}

pub struct SyncEngine {
    pool: PgPool,
    client: Arc<CatalogClient>,
    settings: Arc<SettingsService>,
}

impl SyncEngine {
    pub fn new(pool: PgPool, client: Arc<CatalogClient>, settings: Arc<SettingsService>) -> Self {
        Self {
            pool,
            client,
            settings,
        }
    }

    /// Claim the single-flight slot. Fails fast with `SyncBusy` so a
    /// trigger can answer without waiting for the fetch.
    pub async fn try_begin(&self) -> AppResult<i64> {
        sync_log::begin(&self.pool).await
    }

    /// Full run: claim the slot, then execute.
    pub async fn sync(&self) -> AppResult<SyncReport> {
        let log_id = self.try_begin().await?;
        self.run(log_id).await
    }

    /// Execute a run against an already-claimed sync-log row.
    pub async fn run(&self, log_id: i64) -> AppResult<SyncReport> {
        match self.run_inner().await {
            Ok(report) => {
                sync_log::finish_success(&self.pool, log_id, &report).await?;
                self.settings.stamp_last_sync("success").await?;
                tracing::info!(
                    orders = report.orders_fetched,
                    created = report.orders_created,
                    updated = report.orders_updated,
                    warnings = report.warnings,
                    "sync completed"
                );
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                sync_log::finish_error(&self.pool, log_id, &message).await?;
                self.settings.stamp_last_sync("error").await?;
                tracing::error!("sync failed: {message}");
                Err(e)
            }
        }
    }

    async fn run_inner(&self) -> AppResult<SyncReport> {
        let api = self.settings.api().await?;
        let doc = self.client.fetch(&api.api_base_url, &api.api_key).await?;
        let batch = flatten(&doc);

        let mut report = SyncReport {
            orders_fetched: batch.orders.len() as i32,
            warnings: batch.warnings as i32,
            ..Default::default()
        };

        let mut tx = self.pool.begin().await?;

        // Products first: lines need their ids.
        let mut product_ids: FxHashMap<String, i64> = FxHashMap::default();
        for product in &batch.products {
            let mut sp = (&mut *tx).begin().await?;
            match upsert_product(&mut sp, product).await {
                Ok((id, inserted)) => {
                    sp.commit().await?;
                    product_ids.insert(product.sku.clone(), id);
                    if inserted {
                        report.products_created += 1;
                    } else {
                        report.products_updated += 1;
                    }
                }
                Err(e) => {
                    sp.rollback().await?;
                    tracing::warn!(sku = %product.sku, "product upsert failed: {e}");
                    report.warnings += 1;
                }
            }
        }

        let mut order_ids: FxHashMap<String, i64> = FxHashMap::default();
        for order in &batch.orders {
            let mut sp = (&mut *tx).begin().await?;
            match upsert_order(&mut sp, order).await {
                Ok((id, inserted)) => {
                    sp.commit().await?;
                    order_ids.insert(order.external_id.clone(), id);
                    if inserted {
                        report.orders_created += 1;
                    } else {
                        report.orders_updated += 1;
                    }
                }
                Err(e) => {
                    sp.rollback().await?;
                    tracing::warn!(external_id = %order.external_id, "order upsert failed: {e}");
                    report.warnings += 1;
                }
            }
        }

        for line in &batch.lines {
            let (Some(&order_id), Some(&product_id)) = (
                order_ids.get(&line.external_id),
                product_ids.get(&line.sku),
            ) else {
                // Parent product or order already counted its own warning.
                continue;
            };

            let mut sp = (&mut *tx).begin().await?;
            match upsert_line(&mut sp, order_id, product_id, line.qty).await {
                Ok(outcome) => {
                    sp.commit().await?;
                    match outcome {
                        LineOutcome::Created => report.items_created += 1,
                        LineOutcome::Updated => report.items_updated += 1,
                        LineOutcome::ClampConflict => {
                            tracing::warn!(
                                external_id = %line.external_id,
                                sku = %line.sku,
                                "local progress exceeds new upstream qty; keeping local qty_ordered"
                            );
                            report.warnings += 1;
                        }
                    }
                }
                Err(e) => {
                    sp.rollback().await?;
                    tracing::warn!(
                        external_id = %line.external_id,
                        sku = %line.sku,
                        "line upsert failed: {e}"
                    );
                    report.warnings += 1;
                }
            }
        }

        // Orders gone from the feed were fulfilled externally; follow.
        let fetched_ids: Vec<String> =
            batch.orders.iter().map(|o| o.external_id.clone()).collect();
        let packed = sqlx::query(
            "UPDATE orders_tb
             SET status = 'packed', ready_to_pack = FALSE,
                 packed_at = NOW(), packed_by = 'system', updated_at = NOW()
             WHERE external_id <> ALL($1)
               AND status NOT IN ('packed', 'cancelled')
             RETURNING number",
        )
        .bind(&fetched_ids)
        .fetch_all(&mut *tx)
        .await?;
        for row in &packed {
            tracing::info!(order = %row.get::<String, _>("number"), "auto-packed (absent upstream)");
        }

        // Re-derive every order the run touched.
        for order_id in order_ids.values() {
            derive_and_store(&mut tx, *order_id).await?;
        }

        tx.commit().await?;
        Ok(report)
    }
}

async fn upsert_product(conn: &mut PgConnection, p: &FlatProduct) -> AppResult<(i64, bool)> {
    // COALESCE keeps locally-present optional fields alive when upstream
    // stops sending them.
    let row = sqlx::query(
        "INSERT INTO products_tb
             (sku, title, category, subcategory, image_url, price, vendor_name, variation_details)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (sku) DO UPDATE SET
             title = EXCLUDED.title,
             category = EXCLUDED.category,
             subcategory = COALESCE(EXCLUDED.subcategory, products_tb.subcategory),
             image_url = COALESCE(EXCLUDED.image_url, products_tb.image_url),
             price = COALESCE(EXCLUDED.price, products_tb.price),
             vendor_name = COALESCE(EXCLUDED.vendor_name, products_tb.vendor_name),
             variation_details = COALESCE(EXCLUDED.variation_details, products_tb.variation_details),
             updated_at = NOW()
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(&p.sku)
    .bind(&p.title)
    .bind(&p.category)
    .bind(&p.subcategory)
    .bind(&p.image_url)
    .bind(p.price)
    .bind(&p.vendor_name)
    .bind(&p.variation_details)
    .fetch_one(&mut *conn)
    .await?;
    Ok((row.get("id"), row.get("inserted")))
}

async fn upsert_order(conn: &mut PgConnection, o: &FlatOrder) -> AppResult<(i64, bool)> {
    // Only upstream-owned fields may change on update. Status, shipment
    // cursor, packing stamps and the customer message are authored
    // locally and survive every re-sync; created_at stays put because it
    // anchors FIFO.
    let row = sqlx::query(
        "INSERT INTO orders_tb (external_id, number, customer_name, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (external_id) DO UPDATE SET
             number = EXCLUDED.number,
             customer_name = EXCLUDED.customer_name,
             updated_at = NOW()
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(&o.external_id)
    .bind(&o.number)
    .bind(&o.customer_name)
    .bind(o.created_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok((row.get("id"), row.get("inserted")))
}

enum LineOutcome {
    Created,
    Updated,
    ClampConflict,
}

async fn upsert_line(
    conn: &mut PgConnection,
    order_id: i64,
    product_id: i64,
    qty: i32,
) -> AppResult<LineOutcome> {
    let inserted = sqlx::query(
        "INSERT INTO order_lines_tb (order_id, product_id, qty_ordered)
         VALUES ($1, $2, $3)
         ON CONFLICT (order_id, product_id) DO NOTHING
         RETURNING id",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(qty)
    .fetch_optional(&mut *conn)
    .await?;
    if inserted.is_some() {
        return Ok(LineOutcome::Created);
    }

    let current = sqlx::query(
        "SELECT id, qty_ordered, qty_picked, qty_short
         FROM order_lines_tb WHERE order_id = $1 AND product_id = $2
         FOR UPDATE",
    )
    .bind(order_id)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    let line_id: i64 = current.get("id");
    match reconcile_qty_ordered(
        current.get("qty_ordered"),
        current.get("qty_picked"),
        current.get("qty_short"),
        qty,
    ) {
        QtyReconcile::Unchanged => Ok(LineOutcome::Updated),
        QtyReconcile::Apply => {
            sqlx::query("UPDATE order_lines_tb SET qty_ordered = $1 WHERE id = $2")
                .bind(qty)
                .bind(line_id)
                .execute(&mut *conn)
                .await?;
            Ok(LineOutcome::Updated)
        }
        QtyReconcile::Conflict => Ok(LineOutcome::ClampConflict),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qty_unchanged_is_a_no_op() {
        assert_eq!(reconcile_qty_ordered(5, 2, 1, 5), QtyReconcile::Unchanged);
    }

    #[test]
    fn increase_always_applies() {
        assert_eq!(reconcile_qty_ordered(5, 5, 0, 8), QtyReconcile::Apply);
    }

    #[test]
    fn decrease_applies_when_progress_fits() {
        // picked 2 + short 1 = 3 <= new 3: clamp down is safe.
        assert_eq!(reconcile_qty_ordered(5, 2, 1, 3), QtyReconcile::Apply);
    }

    #[test]
    fn decrease_below_progress_keeps_local_value() {
        // picked 3 + short 1 = 4 > new 2: operator intervention required.
        assert_eq!(reconcile_qty_ordered(5, 3, 1, 2), QtyReconcile::Conflict);
    }

    #[test]
    fn decrease_to_exact_progress_applies() {
        assert_eq!(reconcile_qty_ordered(5, 3, 1, 4), QtyReconcile::Apply);
    }
}
