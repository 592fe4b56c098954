//! Stock-exception engine.
//!
//! Shortages reported from the pick floor are snapshotted per SKU with
//! the affected order numbers; operators work the backlog with resolve
//! and procurement flags. Rows are never deleted.

pub mod models;
pub mod service;
pub mod store;

pub use models::{ExceptionFilter, ExceptionSort, NewStockException, SortDir, StockException};
pub use service::ShortageService;
