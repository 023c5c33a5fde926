//! Document CRUD handlers: list, count, get, create, update, delete.
//! Each handler builds `RequestOptions` from the request and hands off to `CrudService`.

use crate::access::Action;
use crate::error::AppError;
use crate::extractors::RequestMeta;
use crate::response;
use crate::service::{CrudService, RequestOptions};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

type QueryPairs = Query<Vec<(String, String)>>;

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Request body as attributes. An unknown alias is reported before any body problem.
fn request_body(
    state: &AppState,
    alias: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, AppError> {
    state.model_for(alias)?;
    let Json(value) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body_to_map(value)
}

/// Success passes through; failures answer with the bare status, or with the error body in debug mode.
fn respond<T: IntoResponse>(
    state: &AppState,
    alias: &str,
    action: Action,
    result: Result<T, AppError>,
) -> Response {
    match result {
        Ok(body) => body.into_response(),
        Err(err) if state.options.debug => {
            tracing::error!(alias, action = %action, status = %err.status(), error = %err, "request failed");
            err.verbose().into_response()
        }
        Err(err) => {
            tracing::debug!(alias, action = %action, status = %err.status(), error = %err, "request failed");
            err.into_response()
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    meta: RequestMeta,
    Query(params): QueryPairs,
) -> Response {
    let result = CrudService::list(&state, &alias, &meta, RequestOptions::new(params))
        .await
        .map(response::documents);
    respond(&state, &alias, Action::List, result)
}

/// `GET /:alias/:id`. The configured count suffix takes the id slot, so it is checked first.
pub async fn get_or_count(
    State(state): State<AppState>,
    Path((alias, id)): Path<(String, String)>,
    meta: RequestMeta,
    Query(params): QueryPairs,
) -> Response {
    if id == state.options.count_action {
        let result = CrudService::count(&state, &alias, &meta, RequestOptions::new(params))
            .await
            .map(response::count);
        return respond(&state, &alias, Action::Count, result);
    }
    let options = RequestOptions::new(params).with_id(id);
    let result = CrudService::get(&state, &alias, &meta, options)
        .await
        .map(response::document);
    respond(&state, &alias, Action::Get, result)
}

pub async fn create(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    meta: RequestMeta,
    Query(params): QueryPairs,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let result = match request_body(&state, &alias, body) {
        Ok(body) => {
            let options = RequestOptions::new(params).with_body(body);
            CrudService::create(&state, &alias, &meta, options)
                .await
                .map(response::document)
        }
        Err(e) => Err(e),
    };
    respond(&state, &alias, Action::Create, result)
}

pub async fn update(
    State(state): State<AppState>,
    Path((alias, id)): Path<(String, String)>,
    meta: RequestMeta,
    Query(params): QueryPairs,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let result = match request_body(&state, &alias, body) {
        Ok(body) => {
            let options = RequestOptions::new(params).with_id(id).with_body(body);
            CrudService::update(&state, &alias, &meta, options)
                .await
                .map(response::document)
        }
        Err(e) => Err(e),
    };
    respond(&state, &alias, Action::Update, result)
}

pub async fn delete(
    State(state): State<AppState>,
    Path((alias, id)): Path<(String, String)>,
    meta: RequestMeta,
    Query(params): QueryPairs,
) -> Response {
    let options = RequestOptions::new(params).with_id(id);
    let result = CrudService::delete(&state, &alias, &meta, options)
        .await
        .map(response::document);
    respond(&state, &alias, Action::Delete, result)
}
