//! Response bodies: raw documents, the count envelope, and the debug error body.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

/// Body of the count action: `{"response": n}`.
#[derive(Debug, Serialize)]
pub struct CountBody {
    pub response: u64,
}

pub fn document(doc: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(doc))
}

pub fn documents(docs: Vec<Value>) -> (StatusCode, Json<Vec<Value>>) {
    (StatusCode::OK, Json(docs))
}

pub fn count(n: u64) -> (StatusCode, Json<CountBody>) {
    (StatusCode::OK, Json(CountBody { response: n }))
}

pub fn error_body(code: &str, message: String, details: Option<Value>) -> Value {
    serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}
