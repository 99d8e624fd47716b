#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

use api_state::ApiState;
use axum::{
    extract::FromRef,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use middleware_worker_auth::worker_auth;
use routes::{
    probes::{live, ready},
    search::{search_background, search_start, search_status},
};

pub mod api_state;
pub mod error;
mod middleware_worker_auth;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public endpoints: probes plus the client-facing job API
    let public = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/search-start", post(search_start))
        .route("/search-status", get(search_status));

    // Internal worker trigger, guarded by the optional worker secret
    let internal = Router::new()
        .route("/search-resources-background", post(search_background))
        .route_layer(from_fn_with_state(app_state.clone(), worker_auth));

    public.merge(internal)
}
