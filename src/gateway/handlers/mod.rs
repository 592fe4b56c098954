//! HTTP handlers, grouped by surface area. Thin by design: validate,
//! dispatch to an engine, wrap in the envelope.

pub mod admin;
pub mod health;
pub mod orders;
pub mod picklist;
pub mod stock;
pub mod users;
