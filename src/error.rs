//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::error_body;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("either a store handle or a store URI is required")]
    MissingStore,
    #[error("invalid url prefix '{0}': must start with '/' and not end with '/'")]
    InvalidPrefix(String),
    #[error("invalid count action '{0}': must be a single non-empty path segment")]
    InvalidCountAction(String),
    #[error("duplicate model: {0}")]
    DuplicateModel(String),
    #[error("missing reference: model '{model}' field '{field}' refers to unknown model '{target}'")]
    MissingReference {
        model: String,
        field: String,
        target: String,
    },
    #[error("invalid collection name '{0}'")]
    InvalidCollection(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Failures raised by a document store. All of them end the request with 500.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("validation: {0}")]
    Validation(String),
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("remove hook: {0}")]
    Hook(String),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {action} on {model}")]
    Forbidden { model: String, action: &'static str },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ModelNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ModelNotFound(_) => "model_not_found",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden { .. } => "forbidden",
            AppError::BadRequest(_) => "bad_request",
            AppError::Store(StoreError::Validation(_)) => "validation_error",
            AppError::Store(_) => "store_error",
            AppError::Config(_) => "config_error",
        }
    }

    /// Attach the error detail to the body. Only used when debug mode is on.
    pub fn verbose(self) -> VerboseError {
        VerboseError(self)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(e))
    }
}

/// Errors answer with the bare status; the body stays empty.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

/// Debug-mode rendering: server errors echo the underlying error in the body.
pub struct VerboseError(pub AppError);

impl IntoResponse for VerboseError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = err.status();
        if status != StatusCode::INTERNAL_SERVER_ERROR {
            return err.into_response();
        }
        let body = error_body(err.code(), err.to_string(), None);
        (status, Json(body)).into_response()
    }
}
