//! Completion callbacks run after a successful create, update or delete.
//! Their outcome never reaches the HTTP response.

use crate::access::Action;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[async_trait]
pub trait Completion: Send + Sync {
    async fn completed(&self, doc: &Value);
}

#[async_trait]
impl<F> Completion for F
where
    F: Fn(&Value) + Send + Sync,
{
    async fn completed(&self, doc: &Value) {
        self(doc)
    }
}

#[derive(Clone, Default)]
pub struct Callbacks {
    by_key: HashMap<(String, Action), Arc<dyn Completion>>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_key.keys()).finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(self, model: impl Into<String>, action: Action, f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.with(model, action, Arc::new(f))
    }

    pub fn with(mut self, model: impl Into<String>, action: Action, cb: Arc<dyn Completion>) -> Self {
        self.by_key.insert((model.into(), action), cb);
        self
    }

    pub fn resolve(&self, model: &str, action: Action) -> Option<&Arc<dyn Completion>> {
        self.by_key.get(&(model.to_string(), action))
    }

    pub async fn run(&self, model: &str, action: Action, doc: &Value) {
        if let Some(cb) = self.resolve(model, action) {
            tracing::debug!(model, action = %action, "running completion callback");
            cb.completed(doc).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn runs_only_the_matching_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callbacks = Callbacks::new().on("Widget", Action::Create, move |doc| {
            sink.lock().unwrap().push(doc["name"].clone());
        });
        callbacks.run("Widget", Action::Create, &json!({"name": "a"})).await;
        callbacks.run("Widget", Action::Delete, &json!({"name": "b"})).await;
        callbacks.run("Gadget", Action::Create, &json!({"name": "c"})).await;
        assert_eq!(*seen.lock().unwrap(), vec![json!("a")]);
        assert!(callbacks.resolve("Widget", Action::Update).is_none());
    }
}
