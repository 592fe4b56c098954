//! Order domain: models, the derivation function, and explicit
//! operator transitions.
//!
//! `derive::derive_state` is the only writer of `status`/`ready_to_pack`
//! outside the explicit transitions in [`service::OrderService`]; the
//! importer and the picking engine both re-derive through it after any
//! line mutation.

pub mod derive;
pub mod models;
pub mod service;
pub mod store;

pub use derive::{DerivedState, derive_state, validate_split};
pub use models::{LineProgress, Order, OrderLine, OrderStatus};
pub use service::OrderService;
