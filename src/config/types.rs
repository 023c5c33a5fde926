//! Raw model config types, as read from `models.json` or built in code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-field schema: relation target for populate, default value, and validation rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Registered name of the model this field references (for `populate`).
    #[serde(default, rename = "ref")]
    pub ref_model: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    /// Value assigned on create when the body omits the field.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl FieldConfig {
    pub fn reference(model: impl Into<String>) -> Self {
        FieldConfig {
            ref_model: Some(model.into()),
            ..Default::default()
        }
    }

    pub fn required() -> Self {
        FieldConfig {
            required: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Backing collection; derived from the name when omitted.
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, FieldConfig>,
    /// With declared fields, attributes outside them are dropped on write.
    #[serde(default = "default_true")]
    pub strict: bool,
}

fn default_true() -> bool {
    true
}
