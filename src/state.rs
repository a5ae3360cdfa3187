//! Shared application state for all routes.

use crate::config::{ResolvedModel, ResolvedResource};
use crate::store::EntityStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub model: Arc<ResolvedModel>,
    /// Prefix all resource URLs are served under, e.g. "/api". Empty for none.
    pub root_path: String,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, model: ResolvedModel, root_path: impl Into<String>) -> Self {
        AppState {
            store,
            model: Arc::new(model),
            root_path: root_path.into(),
        }
    }

    /// State handed to the handlers of one resource.
    pub fn for_resource(&self, resource: &ResolvedResource) -> ResourceState {
        ResourceState {
            store: self.store.clone(),
            resource: Arc::new(resource.clone()),
            root_path: self.root_path.clone(),
        }
    }
}

/// Per-resource state: the generated routes of a resource close over its definition.
#[derive(Clone)]
pub struct ResourceState {
    pub store: Arc<dyn EntityStore>,
    pub resource: Arc<ResolvedResource>,
    pub root_path: String,
}
