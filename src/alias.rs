//! URL alias to model name.

use crate::config::RemoOptions;

/// Default rule: uppercase the first character, keep the rest.
/// `widget` -> `Widget`, `my_model` -> `My_model`, `MyModel` -> `MyModel`.
pub fn default_alias_to_name(alias: &str) -> String {
    let mut chars = alias.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn resolve_alias(options: &RemoOptions, alias: &str) -> String {
    match &options.alias_to_name {
        Some(f) => f(alias),
        None => default_alias_to_name(alias),
    }
}
