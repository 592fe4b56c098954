//! Stock-exception models and list filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One reported shortage snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockException {
    pub id: i64,
    pub sku: String,
    pub product_title: String,
    pub category: String,
    pub vendor_name: Option<String>,
    pub qty_short: i32,
    /// Affected order numbers at reporting time (denormalized snapshot,
    /// not a foreign-key relation).
    pub order_numbers: Vec<String>,
    pub reported_by: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub ordered_from_company: bool,
    pub na_cancel: bool,
}

/// Insert payload, written by the picking engine inside its transaction.
#[derive(Debug, Clone)]
pub struct NewStockException {
    pub sku: String,
    pub product_title: String,
    pub category: String,
    pub vendor_name: Option<String>,
    pub qty_short: i32,
    pub order_numbers: Vec<String>,
    pub reported_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionSort {
    #[default]
    Timestamp,
    Sku,
    QtyShort,
    Vendor,
}

impl ExceptionSort {
    pub fn column(&self) -> &'static str {
        match self {
            ExceptionSort::Timestamp => "created_at",
            ExceptionSort::Sku => "sku",
            ExceptionSort::QtyShort => "qty_short",
            ExceptionSort::Vendor => "vendor_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// List filter; every field optional.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ExceptionFilter {
    pub resolved: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Free text matched against sku, title, vendor and order numbers.
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ExceptionSort,
    #[serde(default)]
    pub dir: SortDir,
}
