//! Document store abstraction. The dispatcher only talks to `DocumentStore`;
//! `PgDocumentStore` keeps documents as JSONB rows, `MemoryDocumentStore` keeps them in-process.

mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::{ensure_database_exists, PgDocumentStore};

use crate::config::ModelDef;
use crate::error::StoreError;
use crate::query::{Condition, DocumentQuery, Filter};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Identifier field of every document.
pub const ID_FIELD: &str = "_id";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the backing collection if needed.
    async fn ensure_collection(&self, model: &ModelDef) -> Result<(), StoreError>;

    /// Filter, sort, skip and limit. Projection and populate happen above the store.
    async fn find(&self, model: &ModelDef, query: &DocumentQuery) -> Result<Vec<Value>, StoreError>;

    async fn find_one(&self, model: &ModelDef, filter: &Filter) -> Result<Option<Value>, StoreError>;

    async fn find_by_ids(&self, model: &ModelDef, ids: &[String]) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, model: &ModelDef, filter: &Filter) -> Result<u64, StoreError>;

    /// Persist a new document. `doc` already carries its `_id`.
    async fn insert(&self, model: &ModelDef, doc: Map<String, Value>) -> Result<Value, StoreError>;

    /// Overwrite the document stored under `id`. `None` when it does not exist.
    async fn replace(
        &self,
        model: &ModelDef,
        id: &str,
        doc: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    /// Find and remove in one step. Returns the removed document.
    async fn remove(&self, model: &ModelDef, id: &str) -> Result<Option<Value>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Persistence-layer hooks around removal of a loaded document.
/// Only the load-then-remove delete path runs them.
#[async_trait]
pub trait RemoveHook: Send + Sync {
    /// An error here aborts the removal.
    async fn before_remove(&self, _doc: &Value) -> Result<(), StoreError> {
        Ok(())
    }

    async fn after_remove(&self, _doc: &Value) -> Result<(), StoreError> {
        Ok(())
    }
}

/// String form of an `_id` value. Numbers are accepted and stringified.
pub fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifier of a stored document, if it has one.
pub fn document_id(doc: &Value) -> Option<String> {
    doc.get(ID_FIELD).and_then(id_string)
}

pub fn id_filter(id: &str) -> Filter {
    Filter::field(ID_FIELD, Condition::Eq(Value::String(id.to_string())))
}

/// New identifier: a v4 UUID in simple (hex) form.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
