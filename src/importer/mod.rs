//! Import/reconciliation engine.
//!
//! Pulls the upstream catalog document, upserts products, orders and
//! lines without disturbing locally-authored progress, auto-packs orders
//! that vanished from the feed, and keeps the sync-log bookkeeping.

pub mod engine;
pub mod scheduler;
pub mod sync_log;

pub use engine::{SyncEngine, SyncReport};
pub use sync_log::SyncLog;
