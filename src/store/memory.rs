//! In-process document store. Collections are insertion-ordered vectors of JSON objects.

use crate::config::ModelDef;
use crate::error::StoreError;
use crate::query::{DocumentQuery, Filter};
use crate::store::{document_id, DocumentStore, ID_FIELD};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Value>>> {
        self.collections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Value>>> {
        self.collections.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.read().get(collection).cloned().unwrap_or_default()
    }

    fn position(docs: &[Value], id: &str) -> Option<usize> {
        docs.iter().position(|d| document_id(d).as_deref() == Some(id))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ensure_collection(&self, model: &ModelDef) -> Result<(), StoreError> {
        self.write().entry(model.collection.clone()).or_default();
        Ok(())
    }

    async fn find(&self, model: &ModelDef, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        let mut docs: Vec<Value> = self
            .read()
            .get(&model.collection)
            .map(|docs| docs.iter().filter(|d| query.filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        if !query.sort.is_empty() {
            docs.sort_by(|a, b| query.sort.compare(a, b));
        }
        let skip = query.skip.unwrap_or(0) as usize;
        let iter = docs.into_iter().skip(skip);
        Ok(match query.limit {
            Some(n) if n > 0 => iter.take(n as usize).collect(),
            _ => iter.collect(),
        })
    }

    async fn find_one(&self, model: &ModelDef, filter: &Filter) -> Result<Option<Value>, StoreError> {
        Ok(self
            .read()
            .get(&model.collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find_by_ids(&self, model: &ModelDef, ids: &[String]) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .read()
            .get(&model.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| document_id(d).map_or(false, |id| ids.contains(&id)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, model: &ModelDef, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self
            .read()
            .get(&model.collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, model: &ModelDef, doc: Map<String, Value>) -> Result<Value, StoreError> {
        let doc = Value::Object(doc);
        let id = document_id(&doc)
            .ok_or_else(|| StoreError::Validation(format!("{} is required", ID_FIELD)))?;
        let mut guard = self.write();
        let docs = guard.entry(model.collection.clone()).or_default();
        if Self::position(docs, &id).is_some() {
            return Err(StoreError::Duplicate(format!("{}.{} = {}", model.collection, ID_FIELD, id)));
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn replace(
        &self,
        model: &ModelDef,
        id: &str,
        doc: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let mut guard = self.write();
        let Some(docs) = guard.get_mut(&model.collection) else {
            return Ok(None);
        };
        let Some(pos) = Self::position(docs, id) else {
            return Ok(None);
        };
        docs[pos] = Value::Object(doc);
        Ok(Some(docs[pos].clone()))
    }

    async fn remove(&self, model: &ModelDef, id: &str) -> Result<Option<Value>, StoreError> {
        let mut guard = self.write();
        let Some(docs) = guard.get_mut(&model.collection) else {
            return Ok(None);
        };
        Ok(Self::position(docs, id).map(|pos| docs.remove(pos)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
