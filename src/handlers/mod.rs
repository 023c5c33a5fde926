//! HTTP handlers for document CRUD.

pub mod entity;
pub use entity::*;
