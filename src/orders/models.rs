//! Order and order-line models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Order lifecycle status.
///
/// `ready_to_pack` on the order row is a derived cache of "current
/// shipment complete"; the status mirrors it while the order is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Picking,
    ReadyToPack,
    Packed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Picking => "picking",
            OrderStatus::ReadyToPack => "ready_to_pack",
            OrderStatus::Packed => "packed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(OrderStatus::Open),
            "picking" => Some(OrderStatus::Picking),
            "ready_to_pack" => Some(OrderStatus::ReadyToPack),
            "packed" => Some(OrderStatus::Packed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states never re-enter the pick list.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Packed | OrderStatus::Cancelled)
    }
}

/// Full order row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub external_id: String,
    pub number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub ready_to_pack: bool,
    pub total_shipments: i32,
    pub current_shipment: i32,
    pub customer_message: Option<String>,
    pub email_sent: bool,
    pub packed_at: Option<DateTime<Utc>>,
    pub packed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full order-line row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub qty_ordered: i32,
    pub qty_picked: i32,
    pub qty_short: i32,
    pub shipment_batch: i32,
}

impl OrderLine {
    pub fn remaining(&self) -> i32 {
        self.qty_ordered - self.qty_picked - self.qty_short
    }
}

/// The slice of a line the derivation function needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineProgress {
    pub qty_ordered: i32,
    pub qty_picked: i32,
    pub qty_short: i32,
}

impl LineProgress {
    pub fn done(&self) -> bool {
        self.qty_picked + self.qty_short == self.qty_ordered
    }

    pub fn touched(&self) -> bool {
        self.qty_picked > 0 || self.qty_short > 0
    }
}

impl From<&OrderLine> for LineProgress {
    fn from(line: &OrderLine) -> Self {
        Self {
            qty_ordered: line.qty_ordered,
            qty_picked: line.qty_picked,
            qty_short: line.qty_short,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Open,
            OrderStatus::Picking,
            OrderStatus::ReadyToPack,
            OrderStatus::Packed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Packed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::ReadyToPack.is_terminal());
    }
}
