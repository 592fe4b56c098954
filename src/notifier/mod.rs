//! Outbound notification seam.
//!
//! SMTP and SMS delivery are external collaborators; the service only
//! knows this trait and the report formatting. The default transport
//! logs, which keeps every environment without mail credentials working.

use async_trait::async_trait;

use crate::shortage::models::StockException;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Transport that writes the report to the log instead of a wire.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(subject, lines = body.lines().count(), "notifier: report dispatched to log");
        tracing::debug!("{body}");
        Ok(())
    }
}

/// Render the unresolved shortage backlog as a plain-text report.
pub fn render_shortage_report(rows: &[StockException]) -> (String, String) {
    let subject = format!("Out-of-stock report: {} open exception(s)", rows.len());

    let mut body = String::new();
    for row in rows {
        body.push_str(&format!(
            "{} x{} ({}) orders: {} reported by {} at {}\n",
            row.sku,
            row.qty_short,
            row.product_title,
            row.order_numbers.join(", "),
            row.reported_by,
            row.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn report_lists_every_exception() {
        let rows = vec![
            StockException {
                id: 1,
                sku: "A-1".into(),
                product_title: "Milk".into(),
                category: "Dairy".into(),
                vendor_name: None,
                qty_short: 2,
                order_numbers: vec!["1001".into()],
                reported_by: "p1".into(),
                created_at: chrono::Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
                resolved: false,
                ordered_from_company: false,
                na_cancel: false,
            },
            StockException {
                id: 2,
                sku: "B-2".into(),
                product_title: "Eggs".into(),
                category: "Dairy".into(),
                vendor_name: None,
                qty_short: 5,
                order_numbers: vec!["1002".into(), "1003".into()],
                reported_by: "p2".into(),
                created_at: chrono::Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
                resolved: false,
                ordered_from_company: false,
                na_cancel: false,
            },
        ];
        let (subject, body) = render_shortage_report(&rows);
        assert!(subject.contains("2 open"));
        assert_eq!(body.lines().count(), 2);
        assert!(body.contains("A-1 x2"));
        assert!(body.contains("1002, 1003"));
    }
}
