//! Load model configs from `models.json` and runtime options from the environment.

use crate::config::{DeleteMode, ModelConfig, ModelRegistry, RemoOptions};
use crate::error::ConfigError;
use std::path::Path;

pub const MODELS_FILE: &str = "models.json";

/// Parse a JSON array of model configs.
pub fn parse_models(json: &str) -> Result<Vec<ModelConfig>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read `<dir>/models.json` and build a registry from it.
pub async fn load_models_from_path(dir: impl AsRef<Path>) -> Result<ModelRegistry, ConfigError> {
    let path = dir.as_ref().join(MODELS_FILE);
    tracing::debug!(path = %path.display(), "loading models");
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    ModelRegistry::from_configs(parse_models(&raw)?)
}

impl RemoOptions {
    /// Options from `REMO_*` variables and `DATABASE_URL`. Unset variables keep defaults.
    /// Access rules, callbacks and alias overrides are code-only and stay empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = RemoOptions::default();
        if let Some(url) = get("REMO_URL") {
            opts.url = url;
        }
        if let Some(debug) = get("REMO_DEBUG") {
            opts.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(uri) = get("DATABASE_URL").filter(|s| !s.is_empty()) {
            opts.store_uri = Some(uri);
        }
        if let Some(action) = get("REMO_COUNT_ACTION") {
            opts.count_action = action;
        }
        if let Some(mode) = get("REMO_DELETE_MODE") {
            opts.delete_mode = mode.parse::<DeleteMode>()?;
        }
        if let Some(field) = get("REMO_SOFT_DELETE_FIELD") {
            opts.soft_delete_field = Some(field).filter(|s| !s.is_empty());
        }
        if let Some(schema) = get("REMO_SCHEMA") {
            opts.schema = schema;
        }
        if let Some(limit) = get("REMO_BODY_LIMIT") {
            opts.body_limit = limit
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid REMO_BODY_LIMIT: {}", limit)))?;
        }
        if let Some(n) = get("REMO_MAX_CONNECTIONS") {
            opts.max_connections = n
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid REMO_MAX_CONNECTIONS: {}", n)))?;
        }
        Ok(opts)
    }
}
