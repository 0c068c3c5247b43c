use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::require_api_key;
use crate::handlers::{download_handler, health_handler, root_handler};
use crate::state::AppState;

/// Build the service router. Only `/download` sits behind the API key gate.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route(
            "/download",
            post(download_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_api_key,
            )),
        )
        .layer(trace_layer)
        .with_state(state)
}
