//! Document CRUD routes under the configured prefix.
//! Paths are parameterized; handlers resolve the model from the alias segment.
//! The count action shares the `/:alias/:id` GET route so the suffix stays configurable.

use crate::handlers::entity::{create, delete as delete_handler, get_or_count, list, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn remo_routes(state: AppState) -> Router {
    let prefix = state.options.url.clone();
    let body_limit = state.options.body_limit;
    let routes = Router::new()
        .route("/:alias", get(list).post(create))
        .route(
            "/:alias/:id",
            get(get_or_count).put(update).delete(delete_handler),
        )
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state);
    if prefix == "/" {
        return routes;
    }
    Router::new().nest(&prefix, routes)
}

/// Merge the CRUD routes into an existing application router.
pub fn mount(app: Router, state: AppState) -> Router {
    app.merge(remo_routes(state))
}
