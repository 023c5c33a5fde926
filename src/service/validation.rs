//! Field rules from model config: strict attribute filtering, defaults, validation.
//! Failures are store failures, like a schema validation error raised on save.

use crate::config::{FieldConfig, ModelDef};
use crate::error::StoreError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-field rules. All required fields must be present.
    pub fn validate(
        body: &Map<String, Value>,
        fields: &HashMap<String, FieldConfig>,
    ) -> Result<(), StoreError> {
        for (name, rule) in fields {
            let val = body.get(name);
            if rule.required == Some(true) && (val.is_none() || val == Some(&Value::Null)) {
                return Err(StoreError::Validation(format!("{} is required", name)));
            }
            if let Some(v) = val {
                validate_field(name, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for updates). Required is not enforced for missing fields.
    pub fn validate_partial(
        body: &Map<String, Value>,
        fields: &HashMap<String, FieldConfig>,
    ) -> Result<(), StoreError> {
        for (name, v) in body {
            if let Some(rule) = fields.get(name) {
                if rule.required == Some(true) && v.is_null() {
                    return Err(StoreError::Validation(format!("{} is required", name)));
                }
                validate_field(name, v, rule)?;
            }
        }
        Ok(())
    }

    /// Strict models drop attributes that are neither declared nor listed in `keep`.
    pub fn strip_unknown(model: &ModelDef, body: &mut Map<String, Value>, keep: &[&str]) {
        if !model.is_strict() {
            return;
        }
        body.retain(|k, _| model.fields.contains_key(k) || keep.contains(&k.as_str()));
    }

    /// Fill declared defaults for fields the body omits.
    pub fn apply_defaults(body: &mut Map<String, Value>, fields: &HashMap<String, FieldConfig>) {
        for (name, rule) in fields {
            if let Some(default) = &rule.default {
                if !body.contains_key(name) {
                    body.insert(name.clone(), default.clone());
                }
            }
        }
    }
}

fn validate_field(name: &str, v: &Value, rule: &FieldConfig) -> Result<(), StoreError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(name, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(StoreError::Validation(format!(
                    "{} must be at most {} characters",
                    name, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(StoreError::Validation(format!(
                    "{} must be at least {} characters",
                    name, min
                )));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern)
            .map_err(|_| StoreError::Validation(format!("invalid pattern for {}", name)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(StoreError::Validation(format!("{} does not match required pattern", name)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(StoreError::Validation(format!(
                "{} must be one of: {:?}",
                name,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(StoreError::Validation(format!("{} must be at least {}", name, min)));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > max {
                return Err(StoreError::Validation(format!("{} must be at most {}", name, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(name: &str, v: &Value, format: &str) -> Result<(), StoreError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(StoreError::Validation(format!("{} must be a valid email", name)));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(StoreError::Validation(format!("{} must be a valid UUID", name)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn widget() -> ModelDef {
        ModelDef::new("Widget")
            .with_field("name", FieldConfig { max_length: Some(5), ..FieldConfig::required() })
            .with_field(
                "color",
                FieldConfig {
                    allowed: Some(vec![json!("red"), json!("blue")]),
                    default: Some(json!("red")),
                    ..Default::default()
                },
            )
            .with_field("qty", FieldConfig { minimum: Some(0.0), ..Default::default() })
    }

    #[test]
    fn required_and_rules() {
        let m = widget();
        assert!(RequestValidator::validate(&body(json!({"name": "bolt"})), &m.fields).is_ok());
        assert!(RequestValidator::validate(&body(json!({})), &m.fields).is_err());
        assert!(RequestValidator::validate(&body(json!({"name": "toolong"})), &m.fields).is_err());
        assert!(RequestValidator::validate(&body(json!({"name": "a", "color": "green"})), &m.fields).is_err());
        assert!(RequestValidator::validate(&body(json!({"name": "a", "qty": -1})), &m.fields).is_err());
    }

    #[test]
    fn partial_skips_missing_required() {
        let m = widget();
        assert!(RequestValidator::validate_partial(&body(json!({"qty": 3})), &m.fields).is_ok());
        assert!(RequestValidator::validate_partial(&body(json!({"name": null})), &m.fields).is_err());
    }

    #[test]
    fn defaults_and_strict_filtering() {
        let m = widget();
        let mut b = body(json!({"name": "a", "extra": 1, "_id": "x", "_destroy": false}));
        RequestValidator::strip_unknown(&m, &mut b, &["_id", "_destroy"]);
        RequestValidator::apply_defaults(&mut b, &m.fields);
        assert_eq!(Value::Object(b), json!({"name": "a", "color": "red", "_id": "x", "_destroy": false}));

        let loose = ModelDef::new("Loose");
        let mut b = body(json!({"anything": 1}));
        RequestValidator::strip_unknown(&loose, &mut b, &[]);
        assert!(b.contains_key("anything"));
    }
}
