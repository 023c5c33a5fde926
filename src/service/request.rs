//! Per-request options: the ordered query string, path id and body attributes.
//! Access checks receive them and may hand back a narrowed copy.

use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub id: Option<String>,
    pub body: Option<Map<String, Value>>,
}

impl RequestOptions {
    pub fn new(query: Vec<(String, String)>) -> Self {
        RequestOptions {
            query,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// Last value given for `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append a pair; it applies after everything the caller sent.
    pub fn push_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Drop every pair for `key`, then append the new one.
    pub fn set_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.retain(|(k, _)| k != key);
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn remove_query(mut self, key: &str) -> Self {
        self.query.retain(|(k, _)| k != key);
        self
    }
}
