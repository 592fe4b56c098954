//! packflow - warehouse order-picking coordinator.
//!
//! Upstream commerce orders are pulled periodically from an external
//! catalog API and reconciled into a normalized relational model; pickers
//! work an aggregated SKU view with strict FIFO allocation across orders;
//! order state (open -> picking -> ready_to_pack -> packed, with shipment
//! batches) is derived from line-level progress.
//!
//! # Modules
//!
//! - [`config`] - env-driven process configuration
//! - [`db`] - Postgres pool + schema bootstrap
//! - [`catalog`] - upstream client, DTOs and the flatten pass
//! - [`importer`] - sync engine, sync log, interval scheduler
//! - [`picking`] - FIFO pick allocation, shorts, reverts, views
//! - [`orders`] - order state machine and operator transitions
//! - [`shortage`] - stock-exception backlog
//! - [`notifier`] - outbound report transport seam
//! - [`auth`] - operator accounts, JWT, role gates
//! - [`settings`] - API/notifier configuration singletons
//! - [`gateway`] - axum router, handlers, response envelope

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod importer;
pub mod logging;
pub mod notifier;
pub mod orders;
pub mod picking;
pub mod settings;
pub mod shortage;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use db::Database;
pub use error::{AppError, AppResult};
pub use importer::{SyncEngine, SyncReport};
pub use orders::{OrderService, OrderStatus, derive_state};
pub use picking::PickingService;
