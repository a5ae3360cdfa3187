//! Router assembly.

mod common;
mod entity;

pub use common::common_routes_with_ready;
pub use entity::entity_routes;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Full application router: common routes at the top level, resources under the root path.
/// The body limit is enforced by the body extractor, so oversized bodies are reported by the handler.
pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    let resources = entity_routes(state.clone());
    let resources = if state.root_path.is_empty() {
        resources
    } else {
        Router::new().nest(&state.root_path, resources)
    };
    Router::new()
        .merge(common_routes_with_ready(state))
        .merge(resources)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit_bytes)),
        )
}
