//! Generated resource routes. Segments are path parameters; handlers resolve them against the
//! binding table, so one pair of routes serves every model.

use crate::handlers::{discovery, resource, resource_by_id};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Discovery at `/`, resources at `/:segment` and `/:segment/:id`, unprefixed.
pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(discovery))
        .route(
            "/:segment",
            get(resource).post(resource).put(resource).delete(resource),
        )
        .route(
            "/:segment/:id",
            get(resource_by_id)
                .post(resource_by_id)
                .put(resource_by_id)
                .delete(resource_by_id),
        )
        .with_state(state)
}

/// Resource routes under the configured prefix, with tracing and the body size limit applied.
pub fn mount_routes(state: AppState) -> Router {
    let prefix = state.resources.prefix.clone();
    let body_limit = state.resources.body_limit;
    let routes = resource_routes(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(RequestBodyLimitLayer::new(body_limit)),
    );
    if prefix.is_empty() {
        Router::new().merge(routes)
    } else {
        Router::new().nest(&prefix, routes)
    }
}
