//! FIFO pick-allocation engine.
//!
//! SKU-level pick and short actions translate into per-order-line
//! updates under row locks, preserving `picked + short <= ordered` on
//! every line and never exposing a partial allocation.

pub mod allocation;
pub mod models;
pub mod service;

pub use models::{
    MarkShortRequest, PickRequest, PickResult, PickRow, PickedItemRow, RevertRequest,
    RevertResult, ShortAllocation, ShortResult, SkuOrderRow,
};
pub use service::PickingService;
