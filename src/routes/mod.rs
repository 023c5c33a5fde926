//! Routers: document CRUD under the configured prefix, plus health/readiness/version.

pub mod common;
pub mod entity;

pub use common::common_routes;
pub use entity::{mount, remo_routes};
