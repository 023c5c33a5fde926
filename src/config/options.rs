//! Runtime options. Built once at startup and frozen behind an `Arc` in `AppState`.

use crate::access::AccessRules;
use crate::callbacks::Callbacks;
use crate::error::ConfigError;
use crate::store::DocumentStore;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_URL: &str = "/remo";
pub const DEFAULT_COUNT_ACTION: &str = "count";
pub const DEFAULT_SOFT_DELETE_FIELD: &str = "_destroy";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Converts a URL alias into a registered model name.
pub type AliasFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// How the delete action removes a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Single find-and-remove; model remove hooks do not run.
    #[default]
    Direct,
    /// Load the document, run remove hooks around the removal.
    Instance,
}

impl FromStr for DeleteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(DeleteMode::Direct),
            "instance" => Ok(DeleteMode::Instance),
            _ => Err(ConfigError::Validation(format!(
                "invalid delete mode: {} (expected direct or instance)",
                s
            ))),
        }
    }
}

#[derive(Clone)]
pub struct RemoOptions {
    /// URL prefix for all CRUD routes.
    pub url: String,
    /// Log request errors and echo store errors in 500 bodies.
    pub debug: bool,
    /// Existing store handle. Takes precedence over `store_uri`.
    pub store: Option<Arc<dyn DocumentStore>>,
    /// PostgreSQL connection URI, used when no handle is given.
    pub store_uri: Option<String>,
    pub alias_to_name: Option<AliasFn>,
    pub access: AccessRules,
    pub callbacks: Callbacks,
    /// Path segment that routes `GET {url}/:alias/{count_action}` to count.
    pub count_action: String,
    pub delete_mode: DeleteMode,
    /// Flag marking soft-deleted documents; `None` disables the exclusion.
    pub soft_delete_field: Option<String>,
    /// PostgreSQL schema holding collection tables.
    pub schema: String,
    pub body_limit: usize,
    pub max_connections: u32,
}

impl Default for RemoOptions {
    fn default() -> Self {
        RemoOptions {
            url: DEFAULT_URL.into(),
            debug: false,
            store: None,
            store_uri: None,
            alias_to_name: None,
            access: AccessRules::default(),
            callbacks: Callbacks::default(),
            count_action: DEFAULT_COUNT_ACTION.into(),
            delete_mode: DeleteMode::default(),
            soft_delete_field: Some(DEFAULT_SOFT_DELETE_FIELD.into()),
            schema: DEFAULT_SCHEMA.into(),
            body_limit: DEFAULT_BODY_LIMIT,
            max_connections: 5,
        }
    }
}

impl fmt::Debug for RemoOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoOptions")
            .field("url", &self.url)
            .field("debug", &self.debug)
            .field("store", &self.store.is_some())
            .field("store_uri", &self.store_uri.as_ref().map(|_| "<redacted>"))
            .field("alias_to_name", &self.alias_to_name.is_some())
            .field("count_action", &self.count_action)
            .field("delete_mode", &self.delete_mode)
            .field("soft_delete_field", &self.soft_delete_field)
            .field("schema", &self.schema)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

impl RemoOptions {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_store_uri(mut self, uri: impl Into<String>) -> Self {
        self.store_uri = Some(uri.into());
        self
    }

    pub fn with_alias_to_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.alias_to_name = Some(Arc::new(f));
        self
    }

    pub fn with_access(mut self, access: AccessRules) -> Self {
        self.access = access;
        self
    }

    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_count_action(mut self, action: impl Into<String>) -> Self {
        self.count_action = action.into();
        self
    }

    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    pub fn with_soft_delete_field(mut self, field: Option<String>) -> Self {
        self.soft_delete_field = field;
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Pool size used when connecting through `store_uri`.
    pub fn with_max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }
}
