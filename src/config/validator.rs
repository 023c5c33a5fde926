//! Startup validation: option sanity and registry referential integrity.

use crate::config::{ModelRegistry, RemoOptions};
use crate::error::ConfigError;
use regex::Regex;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex"))
}

pub fn validate_options(options: &RemoOptions) -> Result<(), ConfigError> {
    let url = options.url.as_str();
    if !url.starts_with('/') || (url.len() > 1 && url.ends_with('/')) {
        return Err(ConfigError::InvalidPrefix(options.url.clone()));
    }
    let action = options.count_action.as_str();
    if action.is_empty() || action.contains('/') {
        return Err(ConfigError::InvalidCountAction(options.count_action.clone()));
    }
    if options.store.is_none() && options.store_uri.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingStore);
    }
    if !identifier_re().is_match(&options.schema) {
        return Err(ConfigError::Validation(format!("invalid schema name '{}'", options.schema)));
    }
    Ok(())
}

pub fn validate_registry(registry: &ModelRegistry) -> Result<(), ConfigError> {
    for model in registry.models() {
        if model.name.is_empty() {
            return Err(ConfigError::Validation("model name must not be empty".into()));
        }
        if !identifier_re().is_match(&model.collection) {
            return Err(ConfigError::InvalidCollection(model.collection.clone()));
        }
        for (field, def) in &model.fields {
            if let Some(target) = &def.ref_model {
                if registry.get(target).is_none() {
                    return Err(ConfigError::MissingReference {
                        model: model.name.clone(),
                        field: field.clone(),
                        target: target.clone(),
                    });
                }
            }
            if let Some(pattern) = &def.pattern {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("{}.{}: invalid pattern: {}", model.name, field, e))
                })?;
            }
        }
    }
    Ok(())
}
