//! Stock-exception operations: toggles, listing, CSV export, report send.

use sqlx::PgPool;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::notifier::{Notifier, render_shortage_report};

use super::models::{ExceptionFilter, StockException};
use super::store;

#[derive(Clone)]
pub struct ShortageService {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
}

impl ShortageService {
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self { pool, notifier }
    }

    pub async fn get(&self, id: i64) -> AppResult<StockException> {
        store::get(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stock exception {id}")))
    }

    pub async fn list(&self, filter: &ExceptionFilter) -> AppResult<Vec<StockException>> {
        store::list(&self.pool, filter).await
    }

    /// Idempotent: resolving twice is fine.
    pub async fn resolve(&self, id: i64) -> AppResult<StockException> {
        if store::set_flag(&self.pool, id, "resolved", true).await? == 0 {
            return Err(AppError::NotFound(format!("stock exception {id}")));
        }
        self.get(id).await
    }

    pub async fn toggle_ordered(&self, id: i64) -> AppResult<StockException> {
        let current = self.get(id).await?;
        store::set_flag(
            &self.pool,
            id,
            "ordered_from_company",
            !current.ordered_from_company,
        )
        .await?;
        self.get(id).await
    }

    pub async fn toggle_na_cancel(&self, id: i64) -> AppResult<StockException> {
        let current = self.get(id).await?;
        store::set_flag(&self.pool, id, "na_cancel", !current.na_cancel).await?;
        self.get(id).await
    }

    /// CSV body for the current filter result.
    pub async fn export_csv(&self, filter: &ExceptionFilter) -> AppResult<String> {
        let rows = self.list(filter).await?;
        Ok(render_csv(&rows))
    }

    /// Render the unresolved backlog and push it through the notifier
    /// transport. Returns the number of exceptions covered.
    pub async fn send_report(&self) -> AppResult<usize> {
        let filter = ExceptionFilter {
            resolved: Some(false),
            ..Default::default()
        };
        let rows = self.list(&filter).await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let (subject, body) = render_shortage_report(&rows);
        self.notifier
            .send(&subject, &body)
            .await
            .map_err(AppError::Internal)?;
        tracing::info!(count = rows.len(), "out-of-stock report sent");
        Ok(rows.len())
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Manual CSV rendering; no row ever round-trips back in, so writing is
/// the only direction needed.
pub fn render_csv(rows: &[StockException]) -> String {
    let mut out = String::from(
        "sku,title,category,vendor,qty_short,order_numbers,reported_by,reported_at,resolved,ordered_from_company,na_cancel\n",
    );
    for row in rows {
        let line = [
            csv_escape(&row.sku),
            csv_escape(&row.product_title),
            csv_escape(&row.category),
            csv_escape(row.vendor_name.as_deref().unwrap_or("")),
            row.qty_short.to_string(),
            csv_escape(&row.order_numbers.join("; ")),
            csv_escape(&row.reported_by),
            row.created_at.to_rfc3339(),
            row.resolved.to_string(),
            row.ordered_from_company.to_string(),
            row.na_cancel.to_string(),
        ]
        .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn exception(sku: &str, title: &str) -> StockException {
        StockException {
            id: 1,
            sku: sku.to_string(),
            product_title: title.to_string(),
            category: "Dairy".to_string(),
            vendor_name: Some("Acme, Inc".to_string()),
            qty_short: 3,
            order_numbers: vec!["1001".to_string(), "1002".to_string()],
            reported_by: "picker1".to_string(),
            created_at: chrono::Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
            resolved: false,
            ordered_from_company: true,
            na_cancel: false,
        }
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let csv = render_csv(&[exception("A-1", "Milk"), exception("B-2", "Eggs")]);
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("sku,title,"));
    }

    #[test]
    fn csv_quotes_fields_with_commas_and_quotes() {
        let csv = render_csv(&[exception("A-1", r#"Milk "whole", 1L"#)]);
        assert!(csv.contains(r#""Milk ""whole"", 1L""#));
        // Vendor has a comma too.
        assert!(csv.contains(r#""Acme, Inc""#));
    }

    #[test]
    fn csv_joins_order_numbers() {
        let csv = render_csv(&[exception("A-1", "Milk")]);
        assert!(csv.contains("1001; 1002"));
    }
}
