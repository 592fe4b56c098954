//! View and request types for the picking surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Kind of a pick-event audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PickEventKind {
    Pick,
    Short,
    Revert,
}

impl PickEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickEventKind::Pick => "pick",
            PickEventKind::Short => "short",
            PickEventKind::Revert => "revert",
        }
    }
}

/// One aggregated pick-list row: outstanding demand for a SKU across the
/// current shipment batches of all active orders.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PickRow {
    pub sku: String,
    pub title: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub image_url: Option<String>,
    pub needed: i64,
    pub picked: i64,
    pub short: i64,
    pub remaining: i64,
}

/// One order-line behind a pick row, in FIFO position.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkuOrderRow {
    pub line_id: i64,
    pub order_id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub order_created_at: DateTime<Utc>,
    pub qty_ordered: i32,
    pub qty_picked: i32,
    pub qty_short: i32,
    pub remaining: i32,
}

/// One row of the picked-items review view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PickedItemRow {
    pub line_id: i64,
    pub order_id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub sku: String,
    pub title: String,
    pub qty_ordered: i32,
    pub qty_picked: i32,
    pub qty_short: i32,
    pub last_picked_at: Option<DateTime<Utc>>,
}

/// Outcome of one `pick` call.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PickResult {
    pub sku: String,
    pub qty: i32,
    pub allocations: Vec<PickAllocation>,
}

/// Where the picked units landed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PickAllocation {
    pub line_id: i64,
    pub order_id: i64,
    pub order_number: String,
    pub qty: i32,
}

/// Outcome of one `mark_short` call.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShortResult {
    pub sku: String,
    pub total_short: i32,
    pub order_numbers: Vec<String>,
    pub stock_exception_id: i64,
}

/// Outcome of one revert.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevertResult {
    pub line_id: i64,
    pub order_id: i64,
    pub qty_reverted: i32,
    pub qty_picked: i32,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PickRequest {
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(range(min = 1))]
    pub qty: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ShortAllocation {
    pub order_id: i64,
    #[validate(range(min = 1))]
    pub qty_short: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MarkShortRequest {
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(length(min = 1), nested)]
    pub allocations: Vec<ShortAllocation>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RevertRequest {
    /// Omitted = revert the full picked quantity.
    #[validate(range(min = 1))]
    pub qty: Option<i32>,
    pub notes: Option<String>,
}
