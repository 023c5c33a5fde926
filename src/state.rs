//! Shared application state for all routes.

use crate::alias::resolve_alias;
use crate::config::{validate_options, validate_registry, ModelDef, ModelRegistry, RemoOptions};
use crate::error::{AppError, ConfigError};
use crate::store::{DocumentStore, PgDocumentStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub options: Arc<RemoOptions>,
    pub registry: Arc<ModelRegistry>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Validate config, open the store and make sure every model's collection exists.
    /// An explicit store handle takes precedence over `store_uri`.
    pub async fn build(options: RemoOptions, registry: ModelRegistry) -> Result<Self, ConfigError> {
        validate_options(&options)?;
        validate_registry(&registry)?;
        let store: Arc<dyn DocumentStore> = match (&options.store, &options.store_uri) {
            (Some(store), _) => store.clone(),
            (None, Some(uri)) => Arc::new(
                PgDocumentStore::connect(uri, &options.schema, options.max_connections).await?,
            ),
            (None, None) => return Err(ConfigError::MissingStore),
        };
        for model in registry.models() {
            store.ensure_collection(model).await?;
        }
        tracing::info!(url = %options.url, models = registry.len(), "remo dispatcher ready");
        Ok(AppState {
            options: Arc::new(options),
            registry: Arc::new(registry),
            store,
        })
    }

    /// Model registered under the name `alias` maps to. Unknown aliases are `ModelNotFound`.
    pub fn model_for(&self, alias: &str) -> Result<Arc<ModelDef>, AppError> {
        self.registry.model(&resolve_alias(&self.options, alias))
    }

    pub fn soft_delete_field(&self) -> Option<&str> {
        self.options.soft_delete_field.as_deref()
    }
}
