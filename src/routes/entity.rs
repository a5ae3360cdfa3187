//! Generated CRUD routes: one collection route and one record route per resource.

use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

/// Every resource gets `/{path}` (list, create) and `/{path}/:id` (get, update, delete).
/// Suppressed operations stay routed and answer with an `operation_not_exposed` error.
pub fn entity_routes(state: AppState) -> Router {
    state
        .model
        .resources
        .iter()
        .fold(Router::new(), |router, resource| {
            let collection = format!("/{}", resource.path);
            let record = format!("{}/:id", collection);
            tracing::debug!(resource = %resource.name, path = %collection, "mounting resource");
            router.merge(
                Router::new()
                    .route(&collection, get(list).post(create))
                    .route(&record, get(read).put(update).delete(delete_handler))
                    .with_state(state.for_resource(resource)),
            )
        })
}
