//! Upstream document DTOs and the flatten pass.
//!
//! The upstream payload is a four-level tree; the same external order id
//! appears once per product it contains, and the client must not
//! deduplicate (fan-in happens here, in [`flatten`]). Item nodes carry
//! arbitrary extra attributes upstream keeps adding; those land in a
//! catch-all map, get counted, and are dropped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::HashMap;

/// Full upstream document.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub categories: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubcategoryNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<ItemNode>,
}

/// Product node. `sku` and `title` are required for the item to be
/// importable; everything else is optional upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemNode {
    pub sku: Option<String>,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub vendor_name: Option<String>,
    pub variation_details: Option<serde_json::Value>,
    #[serde(default)]
    pub orders: Vec<OrderNode>,
    /// Unknown upstream attributes: counted, logged, dropped.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderNode {
    pub external_order_id: Option<String>,
    pub number: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    pub qty: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One distinct product after fan-in.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatProduct {
    pub sku: String,
    pub title: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub vendor_name: Option<String>,
    pub variation_details: Option<serde_json::Value>,
}

/// One distinct order after fan-in.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatOrder {
    pub external_id: String,
    pub number: String,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
}

/// One `(order, product)` line with quantities summed over duplicate
/// appearances in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLine {
    pub external_id: String,
    pub sku: String,
    pub qty: i32,
}

/// Result of flattening one document.
#[derive(Debug, Default)]
pub struct FlatBatch {
    pub products: Vec<FlatProduct>,
    pub orders: Vec<FlatOrder>,
    pub lines: Vec<FlatLine>,
    /// Per-item problems absorbed during flattening (missing sku,
    /// non-positive qty, missing external id, ...).
    pub warnings: u32,
}

/// Flatten the category tree into distinct products, distinct orders and
/// summed order lines.
///
/// Dedup rules:
/// - products by SKU, last occurrence wins for mutable fields;
/// - orders by external id, earliest `created_at` wins (the FIFO anchor);
/// - lines by `(external_id, sku)`, quantities summed.
pub fn flatten(doc: &Document) -> FlatBatch {
    let mut products: FxHashMap<String, FlatProduct> = FxHashMap::default();
    let mut orders: FxHashMap<String, FlatOrder> = FxHashMap::default();
    let mut lines: FxHashMap<(String, String), i32> = FxHashMap::default();
    let mut product_seen: Vec<String> = Vec::new();
    let mut order_seen: Vec<String> = Vec::new();
    let mut line_seen: Vec<(String, String)> = Vec::new();
    let mut warnings = 0u32;
    let mut unknown_fields = 0usize;

    for category in &doc.categories {
        for sub in &category.subcategories {
            for item in &sub.items {
                unknown_fields += item.extra.len();

                let (sku, title) = match (&item.sku, &item.title) {
                    (Some(sku), Some(title)) if !sku.is_empty() => (sku.clone(), title.clone()),
                    _ => {
                        tracing::warn!(
                            category = %category.name,
                            subcategory = %sub.name,
                            "skipping item without sku/title"
                        );
                        warnings += 1;
                        continue;
                    }
                };

                if !products.contains_key(&sku) {
                    product_seen.push(sku.clone());
                }
                products.insert(
                    sku.clone(),
                    FlatProduct {
                        sku: sku.clone(),
                        title,
                        category: category.name.clone(),
                        subcategory: if sub.name.is_empty() {
                            None
                        } else {
                            Some(sub.name.clone())
                        },
                        image_url: item.image_url.clone(),
                        price: item.price,
                        vendor_name: item.vendor_name.clone(),
                        variation_details: item.variation_details.clone(),
                    },
                );

                for leaf in &item.orders {
                    unknown_fields += leaf.extra.len();

                    let external_id = match &leaf.external_order_id {
                        Some(id) if !id.is_empty() => id.clone(),
                        _ => {
                            warnings += 1;
                            continue;
                        }
                    };
                    let qty = match leaf.qty {
                        Some(q) if q > 0 && q <= i32::MAX as i64 => q as i32,
                        _ => {
                            tracing::warn!(external_id = %external_id, sku = %sku,
                                "skipping order leaf with invalid qty");
                            warnings += 1;
                            continue;
                        }
                    };
                    let created_at = leaf.created_at.unwrap_or_else(Utc::now);

                    match orders.get_mut(&external_id) {
                        Some(existing) => {
                            // Keep the earliest timestamp: FIFO position must
                            // not depend on which product leaf we saw first.
                            if created_at < existing.created_at {
                                existing.created_at = created_at;
                            }
                        }
                        None => {
                            order_seen.push(external_id.clone());
                            orders.insert(
                                external_id.clone(),
                                FlatOrder {
                                    external_id: external_id.clone(),
                                    number: leaf
                                        .number
                                        .clone()
                                        .unwrap_or_else(|| external_id.clone()),
                                    customer_name: leaf.customer_name.clone(),
                                    created_at,
                                },
                            );
                        }
                    }

                    let key = (external_id.clone(), sku.clone());
                    match lines.get_mut(&key) {
                        Some(total) => *total += qty,
                        None => {
                            line_seen.push(key.clone());
                            lines.insert(key, qty);
                        }
                    }
                }
            }
        }
    }

    if unknown_fields > 0 {
        tracing::debug!(count = unknown_fields, "dropped unknown upstream attributes");
    }

    // Emit in first-seen order so import runs are deterministic.
    FlatBatch {
        products: product_seen
            .into_iter()
            .map(|sku| products.remove(&sku).expect("seen product"))
            .collect(),
        orders: order_seen
            .into_iter()
            .map(|id| orders.remove(&id).expect("seen order"))
            .collect(),
        lines: line_seen
            .into_iter()
            .map(|key| {
                let qty = lines.remove(&key).expect("seen line");
                FlatLine {
                    external_id: key.0,
                    sku: key.1,
                    qty,
                }
            })
            .collect(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn flatten_sums_duplicate_order_lines() {
        // Same order under two categories containing the same SKU:
        // quantities must sum, order must stay distinct.
        let d = doc(
            r#"{"categories":[
                {"name":"Dairy","subcategories":[{"name":"Milk","items":[
                    {"sku":"MLK-1","title":"Milk 1L","orders":[
                        {"external_order_id":"E1","number":"1001","customer_name":"A","qty":2,"created_at":"2026-01-02T10:00:00Z"}
                    ]}
                ]}]},
                {"name":"Chilled","subcategories":[{"name":"Milk","items":[
                    {"sku":"MLK-1","title":"Milk 1L","orders":[
                        {"external_order_id":"E1","number":"1001","customer_name":"A","qty":3,"created_at":"2026-01-02T10:00:00Z"}
                    ]}
                ]}]}
            ]}"#,
        );
        let batch = flatten(&d);
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.orders.len(), 1);
        assert_eq!(batch.lines.len(), 1);
        assert_eq!(batch.lines[0].qty, 5);
        assert_eq!(batch.warnings, 0);
    }

    #[test]
    fn flatten_keeps_earliest_order_timestamp() {
        let d = doc(
            r#"{"categories":[{"name":"C","subcategories":[{"name":"S","items":[
                {"sku":"A","title":"a","orders":[
                    {"external_order_id":"E1","number":"1","customer_name":"x","qty":1,"created_at":"2026-01-02T12:00:00Z"}
                ]},
                {"sku":"B","title":"b","orders":[
                    {"external_order_id":"E1","number":"1","customer_name":"x","qty":1,"created_at":"2026-01-02T09:00:00Z"}
                ]}
            ]}]}]}"#,
        );
        let batch = flatten(&d);
        assert_eq!(batch.orders.len(), 1);
        assert_eq!(
            batch.orders[0].created_at.to_rfc3339(),
            "2026-01-02T09:00:00+00:00"
        );
        assert_eq!(batch.lines.len(), 2);
    }

    #[test]
    fn flatten_isolates_malformed_items() {
        let d = doc(
            r#"{"categories":[{"name":"C","subcategories":[{"name":"S","items":[
                {"title":"no sku","orders":[]},
                {"sku":"OK-1","title":"fine","orders":[
                    {"external_order_id":"E1","number":"1","customer_name":"x","qty":0,"created_at":"2026-01-02T09:00:00Z"},
                    {"external_order_id":"E2","number":"2","customer_name":"y","qty":4,"created_at":"2026-01-02T09:05:00Z"}
                ]}
            ]}]}]}"#,
        );
        let batch = flatten(&d);
        // One skipped item + one zero-qty leaf.
        assert_eq!(batch.warnings, 2);
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.orders.len(), 1);
        assert_eq!(batch.lines[0].qty, 4);
    }

    #[test]
    fn unknown_attributes_are_dropped_not_fatal() {
        let d = doc(
            r#"{"categories":[{"name":"C","subcategories":[{"name":"S","items":[
                {"sku":"A","title":"a","shelf_position":"B4","seasonal":true,"orders":[
                    {"external_order_id":"E1","number":"1","customer_name":"x","qty":1,
                     "created_at":"2026-01-02T09:00:00Z","gift_wrap":false}
                ]}
            ]}]}]}"#,
        );
        let batch = flatten(&d);
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.lines.len(), 1);
        assert_eq!(batch.warnings, 0);
    }

    #[test]
    fn product_last_occurrence_wins() {
        let d = doc(
            r#"{"categories":[
                {"name":"Old","subcategories":[{"name":"S1","items":[
                    {"sku":"A","title":"old title","orders":[]}
                ]}]},
                {"name":"New","subcategories":[{"name":"S2","items":[
                    {"sku":"A","title":"new title","vendor_name":"Acme","orders":[]}
                ]}]}
            ]}"#,
        );
        let batch = flatten(&d);
        assert_eq!(batch.products.len(), 1);
        let p = &batch.products[0];
        assert_eq!(p.title, "new title");
        assert_eq!(p.category, "New");
        assert_eq!(p.vendor_name.as_deref(), Some("Acme"));
    }
}
