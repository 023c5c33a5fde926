//! Remo: REST CRUD routes generated over registered document models.
//!
//! `GET|POST {url}/:alias`, `GET|PUT|DELETE {url}/:alias/:id` and `GET {url}/:alias/count`,
//! with per-model access rules, soft-delete filtering and completion callbacks.

pub mod access;
pub mod alias;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use access::{AccessCheck, AccessContext, AccessDecision, AccessRule, AccessRules, Action};
pub use callbacks::{Callbacks, Completion};
pub use config::{
    load_models_from_path, DeleteMode, FieldConfig, ModelConfig, ModelDef, ModelRegistry, RemoOptions,
};
pub use error::{AppError, ConfigError, StoreError};
pub use extractors::RequestMeta;
pub use query::{DocumentQuery, Filter};
pub use routes::{common_routes, mount, remo_routes};
pub use service::{CrudService, RequestOptions};
pub use state::AppState;
pub use store::{
    ensure_database_exists, DocumentStore, MemoryDocumentStore, PgDocumentStore, RemoveHook,
};
