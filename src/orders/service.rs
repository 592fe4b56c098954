//! Explicit order transitions and the derivation applier.
//!
//! Every mutation runs in its own transaction with the order row locked
//! first, so transitions serialize against concurrent pickers touching
//! the same order.

use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};

use super::derive::{DerivedState, derive_state, validate_split};
use super::models::{Order, OrderStatus};
use super::store;

/// Re-derive `status`/`ready_to_pack` from the current shipment batch and
/// persist the result. No-op for terminal orders: an auto-packed order
/// must not regress just because a stale line write arrives.
pub async fn derive_and_store(conn: &mut PgConnection, order_id: i64) -> AppResult<DerivedState> {
    let order = store::get_for_update(&mut *conn, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    if order.status.is_terminal() {
        return Ok(DerivedState {
            status: order.status,
            ready_to_pack: order.ready_to_pack,
        });
    }

    let progress = store::batch_progress(&mut *conn, order_id, order.current_shipment).await?;
    let derived = derive_state(&progress);

    if derived.status != order.status || derived.ready_to_pack != order.ready_to_pack {
        store::apply_derived(&mut *conn, order_id, derived.status, derived.ready_to_pack).await?;
    }
    Ok(derived)
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn locked(&self, conn: &mut PgConnection, order_id: i64) -> AppResult<Order> {
        store::get_for_update(&mut *conn, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
    }

    /// Pack the current shipment. Advances to the next batch when one
    /// remains, otherwise terminal-packs the order.
    pub async fn mark_packed(&self, order_id: i64, username: &str) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order = self.locked(&mut tx, order_id).await?;

        if order.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "order {} is already {}",
                order.number,
                order.status.as_str()
            )));
        }

        // Re-derive at call time instead of trusting the cached flag.
        let progress = store::batch_progress(&mut *tx, order_id, order.current_shipment).await?;
        if !derive_state(&progress).ready_to_pack {
            return Err(AppError::InvalidTransition(format!(
                "order {} is not ready to pack",
                order.number
            )));
        }

        if order.current_shipment < order.total_shipments {
            // More batches to go: advance the cursor and fall back to
            // picking for the next batch.
            sqlx::query(
                "UPDATE orders_tb
                 SET current_shipment = current_shipment + 1,
                     ready_to_pack = FALSE, updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
            derive_and_store(&mut tx, order_id).await?;
            tracing::info!(
                order = %order.number,
                shipment = order.current_shipment + 1,
                by = username,
                "shipment packed, advanced to next batch"
            );
        } else {
            sqlx::query(
                "UPDATE orders_tb
                 SET status = 'packed', ready_to_pack = FALSE,
                     packed_at = NOW(), packed_by = $1, updated_at = NOW()
                 WHERE id = $2",
            )
            .bind(username)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
            tracing::info!(order = %order.number, by = username, "order packed");
        }

        let updated = self.locked(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Admin reversal: `ready_to_pack -> picking`. Quantities are
    /// preserved; operators revert individual picked lines if they want
    /// to unwind progress.
    pub async fn revert_to_picking(&self, order_id: i64) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order = self.locked(&mut tx, order_id).await?;

        if order.status != OrderStatus::ReadyToPack {
            return Err(AppError::InvalidTransition(format!(
                "order {} is {}, not ready_to_pack",
                order.number,
                order.status.as_str()
            )));
        }

        sqlx::query(
            "UPDATE orders_tb
             SET status = 'picking', ready_to_pack = FALSE, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        let updated = self.locked(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Admin reversal out of `packed`. Target must be one of
    /// `ready_to_pack`, `picking`, `open`; `packed_*` is cleared, and
    /// non-ready targets also rewind the shipment cursor.
    pub async fn change_state(&self, order_id: i64, target: OrderStatus) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order = self.locked(&mut tx, order_id).await?;

        if order.status != OrderStatus::Packed {
            return Err(AppError::InvalidTransition(format!(
                "order {} is {}, only packed orders can change state",
                order.number,
                order.status.as_str()
            )));
        }

        match target {
            OrderStatus::ReadyToPack => {
                sqlx::query(
                    "UPDATE orders_tb
                     SET status = 'ready_to_pack', ready_to_pack = TRUE,
                         packed_at = NULL, packed_by = NULL, updated_at = NOW()
                     WHERE id = $1",
                )
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
            }
            OrderStatus::Open | OrderStatus::Picking => {
                sqlx::query(
                    "UPDATE orders_tb
                     SET status = $1, ready_to_pack = FALSE,
                         packed_at = NULL, packed_by = NULL,
                         current_shipment = 1, updated_at = NOW()
                     WHERE id = $2",
                )
                .bind(target.as_str())
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
            }
            other => {
                return Err(AppError::Validation(format!(
                    "cannot change state to {}",
                    other.as_str()
                )));
            }
        }

        let updated = self.locked(&mut tx, order_id).await?;
        tx.commit().await?;
        tracing::info!(order = %updated.number, to = target.as_str(), "order state changed");
        Ok(updated)
    }

    /// Partition the order's lines into shipment batches.
    pub async fn split(&self, order_id: i64, assignments: &[(i64, i32)]) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order = self.locked(&mut tx, order_id).await?;

        if order.status == OrderStatus::Packed {
            return Err(AppError::InvalidTransition(format!(
                "order {} is packed and cannot be split",
                order.number
            )));
        }

        let lines = store::lines(&mut *tx, order_id).await?;
        if lines.iter().any(|l| l.shipment_batch != order.current_shipment) {
            return Err(AppError::InvalidTransition(
                "order already has lines outside the current shipment; unsplit first".into(),
            ));
        }

        let line_ids: Vec<i64> = lines.iter().map(|l| l.id).collect();
        let plan = validate_split(&line_ids, assignments)?;

        for (line_id, batch) in &plan.assignments {
            sqlx::query("UPDATE order_lines_tb SET shipment_batch = $1 WHERE id = $2")
                .bind(batch)
                .bind(line_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            "UPDATE orders_tb
             SET total_shipments = $1, current_shipment = 1, updated_at = NOW()
             WHERE id = $2",
        )
        .bind(plan.total_shipments)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        derive_and_store(&mut tx, order_id).await?;
        let updated = self.locked(&mut tx, order_id).await?;
        tx.commit().await?;
        tracing::info!(
            order = %updated.number,
            shipments = plan.total_shipments,
            "order split into shipment batches"
        );
        Ok(updated)
    }

    /// Collapse all shipment batches back into one.
    pub async fn unsplit(&self, order_id: i64) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order = self.locked(&mut tx, order_id).await?;

        if order.status == OrderStatus::Packed {
            return Err(AppError::InvalidTransition(format!(
                "order {} is packed and cannot be unsplit",
                order.number
            )));
        }

        sqlx::query("UPDATE order_lines_tb SET shipment_batch = 1 WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE orders_tb
             SET total_shipments = 1, current_shipment = 1, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        derive_and_store(&mut tx, order_id).await?;
        let updated = self.locked(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn update_message(
        &self,
        order_id: i64,
        message: Option<String>,
    ) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;
        self.locked(&mut tx, order_id).await?;

        sqlx::query(
            "UPDATE orders_tb SET customer_message = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(&message)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        let updated = self.locked(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub async fn active(&self) -> AppResult<Vec<Order>> {
        store::list_active(&self.pool).await
    }

    pub async fn ready_to_pack(&self) -> AppResult<Vec<Order>> {
        store::list_ready_to_pack(&self.pool).await
    }

    pub async fn packed(&self, limit: i64, offset: i64) -> AppResult<Vec<Order>> {
        store::list_packed(&self.pool, limit.clamp(1, 500), offset.max(0)).await
    }

    pub async fn detail(&self, order_id: i64) -> AppResult<(Order, Vec<store::LineDetail>)> {
        let order = store::get(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
        let lines = store::line_details(&self.pool, order_id).await?;
        Ok((order, lines))
    }
}
