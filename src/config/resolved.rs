//! Resolved model registry: model definitions keyed by registered name.

use crate::config::{FieldConfig, ModelConfig};
use crate::error::{AppError, ConfigError};
use crate::store::RemoveHook;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct ModelDef {
    pub name: String,
    pub collection: String,
    pub fields: HashMap<String, FieldConfig>,
    pub strict: bool,
    /// Run only when a document is loaded before removal (`DeleteMode::Instance`).
    pub remove_hooks: Vec<Arc<dyn RemoveHook>>,
}

impl fmt::Debug for ModelDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDef")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("fields", &self.fields)
            .field("strict", &self.strict)
            .field("remove_hooks", &self.remove_hooks.len())
            .finish()
    }
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        ModelDef {
            collection: default_collection(&name),
            name,
            fields: HashMap::new(),
            strict: true,
            remove_hooks: Vec::new(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field: FieldConfig) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_remove_hook(mut self, hook: Arc<dyn RemoveHook>) -> Self {
        self.remove_hooks.push(hook);
        self
    }

    /// Model referenced by `path`, if the path is declared as a relation.
    pub fn ref_for(&self, path: &str) -> Option<&str> {
        self.fields.get(path).and_then(|f| f.ref_model.as_deref())
    }

    /// Strict mode only applies once fields are declared.
    pub fn is_strict(&self) -> bool {
        self.strict && !self.fields.is_empty()
    }
}

impl From<ModelConfig> for ModelDef {
    fn from(c: ModelConfig) -> Self {
        let mut def = ModelDef::new(c.name).strict(c.strict);
        if let Some(collection) = c.collection {
            def.collection = collection;
        }
        def.fields = c.fields;
        def
    }
}

/// Lowercased, pluralised model name: `Widget` -> `widgets`.
pub fn default_collection(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.ends_with('s') {
        lower
    } else {
        format!("{}s", lower)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    by_name: HashMap<String, Arc<ModelDef>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: Vec<ModelConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for c in configs {
            registry.register(c.into())?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, def: ModelDef) -> Result<(), ConfigError> {
        if self.by_name.contains_key(&def.name) {
            return Err(ConfigError::DuplicateModel(def.name));
        }
        self.by_name.insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    pub fn with_model(mut self, def: ModelDef) -> Result<Self, ConfigError> {
        self.register(def)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModelDef>> {
        self.by_name.get(name)
    }

    /// Lookup that fails the request with 404 when nothing is registered under `name`.
    pub fn model(&self, name: &str) -> Result<Arc<ModelDef>, AppError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| AppError::ModelNotFound(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelDef>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
