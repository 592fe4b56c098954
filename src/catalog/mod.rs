//! Upstream catalog client.
//!
//! The external commerce API serves one JSON document shaped as
//! `categories[].subcategories[].items[].orders[]`. This module owns the
//! strict DTOs for that tree, the HTTP client that fetches it, and the
//! pure flatten pass that turns the tree into the three streams the
//! importer consumes.

pub mod client;
pub mod types;

pub use client::CatalogClient;
pub use types::{Document, FlatBatch, FlatLine, FlatOrder, FlatProduct, flatten};
