//! Populate: replace referenced ids with the referenced documents.
//! Only paths declared with a `ref` are expanded; other requested paths are ignored.

use crate::config::{ModelDef, ModelRegistry};
use crate::error::StoreError;
use crate::store::{document_id, id_string, DocumentStore};
use serde_json::Value;
use std::collections::HashMap;

pub async fn populate(
    store: &dyn DocumentStore,
    registry: &ModelRegistry,
    model: &ModelDef,
    paths: &[String],
    docs: &mut [Value],
) -> Result<(), StoreError> {
    for path in paths {
        let Some(target) = model.ref_for(path).and_then(|name| registry.get(name)) else {
            tracing::debug!(model = %model.name, path = %path, "populate path is not a reference; skipped");
            continue;
        };
        let mut ids: Vec<String> = Vec::new();
        for doc in docs.iter() {
            match lookup(doc, path) {
                Some(Value::Array(items)) => ids.extend(items.iter().filter_map(id_string)),
                Some(v) => ids.extend(id_string(v)),
                None => {}
            }
        }
        if ids.is_empty() {
            continue;
        }
        ids.sort();
        ids.dedup();
        let related: HashMap<String, Value> = store
            .find_by_ids(target, &ids)
            .await?
            .into_iter()
            .filter_map(|d| document_id(&d).map(|id| (id, d)))
            .collect();
        for doc in docs.iter_mut() {
            let Some(slot) = lookup_mut(doc, path) else {
                continue;
            };
            let replacement = match &*slot {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .filter_map(|v| id_string(v).and_then(|id| related.get(&id).cloned()))
                        .collect(),
                ),
                Value::Null => Value::Null,
                v => id_string(v)
                    .and_then(|id| related.get(&id).cloned())
                    .unwrap_or(Value::Null),
            };
            *slot = replacement;
        }
    }
    Ok(())
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    crate::query::filter::lookup(doc, path)
}

fn lookup_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut cur = doc;
    for seg in path.split('.') {
        cur = match cur {
            Value::Object(m) => m.get_mut(seg)?,
            _ => return None,
        };
    }
    Some(cur)
}
